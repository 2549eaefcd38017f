//! Single-owner fan-out actor for the live leaderboard stream.

use std::{
    collections::HashMap,
    pin::Pin,
    sync::atomic::{AtomicU64, Ordering},
    task::{Context, Poll},
};

use futures::Stream;
use thiserror::Error;
use tokio::sync::{
    mpsc::{self, error::TrySendError},
    oneshot, watch,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Returned when the hub actor is no longer running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("broadcast hub is closed")]
pub struct HubClosed;

/// Point-in-time view of the actor's bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubStats {
    /// Registered subscriptions.
    pub subscribers: usize,
    /// Whether a payload has been published yet.
    pub cached: bool,
}

enum HubCommand<T> {
    Subscribe {
        id: u64,
        sender: mpsc::Sender<T>,
        ack: oneshot::Sender<()>,
    },
    Unsubscribe {
        id: u64,
    },
    Inspect {
        reply: oneshot::Sender<HubStats>,
    },
}

/// Handle to the hub actor.
///
/// The actor exclusively owns the subscriber set and the cached payload. Callers
/// talk to it through a latest-value publish slot and a command queue; the actor
/// stops once this handle is dropped.
pub struct BroadcastHub<T> {
    publish: watch::Sender<Option<T>>,
    commands: mpsc::UnboundedSender<HubCommand<T>>,
    next_id: AtomicU64,
    subscriber_buffer: usize,
}

impl<T> BroadcastHub<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Spawn the actor; every subscriber gets a channel holding `subscriber_buffer` payloads.
    pub fn new(subscriber_buffer: usize) -> Self {
        let (publish, published) = watch::channel(None);
        let (commands, inbox) = mpsc::unbounded_channel();
        tokio::spawn(run_actor(published, inbox));

        Self {
            publish,
            commands,
            next_id: AtomicU64::new(0),
            subscriber_buffer: subscriber_buffer.max(1),
        }
    }

    /// Hand a payload to the actor without waiting.
    ///
    /// A payload the actor has not picked up yet is replaced by this one.
    pub fn publish(&self, payload: T) {
        self.publish.send_replace(Some(payload));
    }

    /// Register a subscriber whose lifetime is bounded by `cancel`.
    ///
    /// The cached payload, if any, is already queued on the returned
    /// subscription when this resolves.
    pub async fn subscribe(&self, cancel: CancellationToken) -> Result<Subscription<T>, HubClosed> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.subscriber_buffer);
        let (ack, acked) = oneshot::channel();

        self.commands
            .send(HubCommand::Subscribe { id, sender, ack })
            .map_err(|_| HubClosed)?;
        acked.await.map_err(|_| HubClosed)?;

        let token = cancel.child_token();
        let watched = token.clone();
        let commands = self.commands.clone();
        tokio::spawn(async move {
            watched.cancelled().await;
            let _ = commands.send(HubCommand::Unsubscribe { id });
        });

        Ok(Subscription {
            id,
            receiver,
            cancel: token,
        })
    }

    /// Ask the actor how many subscribers it tracks and whether a payload is cached.
    pub async fn stats(&self) -> Result<HubStats, HubClosed> {
        let (reply, stats) = oneshot::channel();
        self.commands
            .send(HubCommand::Inspect { reply })
            .map_err(|_| HubClosed)?;
        stats.await.map_err(|_| HubClosed)
    }
}

async fn run_actor<T: Clone>(
    mut published: watch::Receiver<Option<T>>,
    mut inbox: mpsc::UnboundedReceiver<HubCommand<T>>,
) {
    let mut subscribers: HashMap<u64, mpsc::Sender<T>> = HashMap::new();
    let mut cached: Option<T> = None;

    loop {
        tokio::select! {
            biased;

            changed = published.changed() => {
                if changed.is_err() {
                    break;
                }
                let Some(payload) = published.borrow_and_update().clone() else {
                    continue;
                };
                subscribers.retain(|id, sender| match sender.try_send(payload.clone()) {
                    Ok(()) => true,
                    Err(TrySendError::Full(_)) => {
                        debug!(subscriber = id, "subscriber lagging, frame skipped");
                        true
                    }
                    Err(TrySendError::Closed(_)) => false,
                });
                cached = Some(payload);
            }
            command = inbox.recv() => {
                let Some(command) = command else {
                    break;
                };
                match command {
                    HubCommand::Subscribe { id, sender, ack } => {
                        if let Some(payload) = cached.as_ref() {
                            let _ = sender.try_send(payload.clone());
                        }
                        subscribers.insert(id, sender);
                        let _ = ack.send(());
                    }
                    HubCommand::Unsubscribe { id } => {
                        if subscribers.remove(&id).is_some() {
                            debug!(subscriber = id, "subscriber removed");
                        }
                    }
                    HubCommand::Inspect { reply } => {
                        let _ = reply.send(HubStats {
                            subscribers: subscribers.len(),
                            cached: cached.is_some(),
                        });
                    }
                }
            }
        }
    }

    debug!("broadcast hub stopped");
}

/// Receiving side of a hub subscription.
///
/// Ends once its token is cancelled, on [`Subscription::unsubscribe`], or when
/// the hub stops. Dropping it unsubscribes.
pub struct Subscription<T> {
    id: u64,
    receiver: mpsc::Receiver<T>,
    cancel: CancellationToken,
}

impl<T> Subscription<T> {
    /// Hub-assigned identifier, unique per hub.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Next payload, or `None` once the subscription is over.
    pub async fn recv(&mut self) -> Option<T> {
        if self.cancel.is_cancelled() {
            return None;
        }
        self.receiver.recv().await
    }

    /// Leave the hub. Safe to call any number of times.
    pub fn unsubscribe(&self) {
        self.cancel.cancel();
    }
}

impl<T> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        // After cancellation the actor drops the sender, which also wakes a pending poll.
        if self.cancel.is_cancelled() {
            return Poll::Ready(None);
        }
        self.receiver.poll_recv(cx)
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::StreamExt;
    use tokio::time::timeout;

    use super::*;

    async fn wait_for_subscribers(hub: &BroadcastHub<u32>, expected: usize) {
        timeout(Duration::from_secs(1), async {
            while hub.stats().await.unwrap().subscribers != expected {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("subscriber count never settled");
    }

    #[tokio::test]
    async fn publish_without_subscribers_only_fills_cache() {
        let hub = BroadcastHub::new(1);
        hub.publish(7_u32);
        let stats = hub.stats().await.unwrap();
        assert_eq!(
            stats,
            HubStats {
                subscribers: 0,
                cached: true
            }
        );
    }

    #[tokio::test]
    async fn late_subscriber_receives_cached_payload() {
        let hub = BroadcastHub::new(1);
        hub.publish(1_u32);
        hub.publish(2_u32);
        hub.stats().await.unwrap();

        let mut subscription = hub.subscribe(CancellationToken::new()).await.unwrap();
        assert_eq!(subscription.recv().await, Some(2));
    }

    #[tokio::test]
    async fn dropping_subscription_unregisters_it() {
        let hub = BroadcastHub::<u32>::new(1);
        let subscription = hub.subscribe(CancellationToken::new()).await.unwrap();
        wait_for_subscribers(&hub, 1).await;

        drop(subscription);
        wait_for_subscribers(&hub, 0).await;
    }

    #[tokio::test]
    async fn parent_cancellation_ends_the_stream() {
        let hub = BroadcastHub::<u32>::new(1);
        let shutdown = CancellationToken::new();
        let mut subscription = hub.subscribe(shutdown.clone()).await.unwrap();

        shutdown.cancel();
        let next = timeout(Duration::from_secs(1), subscription.next())
            .await
            .unwrap();
        assert_eq!(next, None);
        wait_for_subscribers(&hub, 0).await;
    }

    #[tokio::test]
    async fn dropping_hub_closes_subscriptions() {
        let hub = BroadcastHub::<u32>::new(1);
        let mut subscription = hub.subscribe(CancellationToken::new()).await.unwrap();
        drop(hub);

        let next = timeout(Duration::from_secs(1), subscription.recv())
            .await
            .unwrap();
        assert_eq!(next, None);
    }
}
