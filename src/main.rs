//! Hunt Board binary entrypoint wiring REST, SSE, storage supervision and the leaderboard refresher.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "mongo-store")]
use hunt_board::dao::progress_store::mongodb::{MongoConfig, MongoProgressStore};
use hunt_board::{
    config::AppConfig,
    dao::{
        progress_store::{InMemoryProgressStore, ProgressStore},
        storage::StorageError,
    },
    routes,
    services::{leaderboard_service, storage_supervisor},
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let app_state = AppState::new(AppConfig::load());

    spawn_storage(&app_state).await?;
    leaderboard_service::spawn_refresher(&app_state);

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state.clone());

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal(app_state.shutdown_token().clone()))
        .await
        .context("serving axum")?;

    Ok(())
}

/// Start the supervisor for the backend selected by `STORE_BACKEND`.
async fn spawn_storage(state: &SharedState) -> anyhow::Result<()> {
    let backend = env::var("STORE_BACKEND").unwrap_or_else(|_| "mongo".into());
    match backend.as_str() {
        "memory" => {
            warn!("using the in-memory progress store; progress is lost on restart");
            let store = InMemoryProgressStore::new();
            tokio::spawn(storage_supervisor::run(state.clone(), move || {
                let store = store.clone();
                async move { Ok::<Arc<dyn ProgressStore>, StorageError>(Arc::new(store)) }
            }));
            Ok(())
        }
        #[cfg(feature = "mongo-store")]
        "mongo" => {
            let config = MongoConfig::from_env()
                .await
                .context("reading MongoDB configuration")?;
            tokio::spawn(storage_supervisor::run(state.clone(), move || {
                let config = config.clone();
                async move {
                    let store = MongoProgressStore::connect(config).await?;
                    Ok::<Arc<dyn ProgressStore>, StorageError>(Arc::new(store))
                }
            }));
            Ok(())
        }
        other => anyhow::bail!("unsupported STORE_BACKEND `{other}`"),
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM, then cancel `shutdown` so open SSE streams end
/// and the server can drain.
async fn shutdown_signal(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("shutdown requested");
    shutdown.cancel();
}
