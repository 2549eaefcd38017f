use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};

use crate::{
    dto::sse::ServerEvent,
    error::ServiceError,
    state::{SharedState, Subscription},
};

/// Subscribe to the leaderboard hub for the lifetime of the application.
///
/// The cached snapshot, if any, is the first item of the subscription.
pub async fn subscribe_leaderboard(
    state: &SharedState,
) -> Result<Subscription<Arc<ServerEvent>>, ServiceError> {
    let subscription = state
        .leaderboard_hub()
        .subscribe(state.shutdown_token().clone())
        .await?;
    Ok(subscription)
}

/// Convert a hub subscription into an SSE response.
///
/// The subscription travels with the response stream; axum drops it when the
/// client disconnects, which unsubscribes from the hub.
pub fn to_sse_stream(
    subscription: Subscription<Arc<ServerEvent>>,
    keep_alive: Duration,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = subscription.map(|payload| Ok(to_event(&payload)));
    Sse::new(stream).keep_alive(KeepAlive::new().interval(keep_alive).text("keep-alive"))
}

fn to_event(payload: &ServerEvent) -> Event {
    let event = Event::default().data(payload.data.as_str());
    match &payload.event {
        Some(name) => event.event(name),
        None => event,
    }
}
