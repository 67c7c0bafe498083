//! Pollamanía back-end entrypoint wiring REST, SSE, the fixtures provider and the remote store.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pollamania_back::{
    config::AppConfig,
    dao::{
        fixtures::{FootballDataClient, FootballDataConfig},
        pool_store::memory::MemoryStore,
    },
    routes,
    services::{fixture_service, snapshot_service},
    state::{AppState, SharedState},
};

const TOKEN_ENV: &str = "FOOTBALL_DATA_TOKEN";
const STORE_BACKEND_ENV: &str = "STORE_BACKEND";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let token = env::var(TOKEN_ENV).ok().filter(|value| !value.is_empty());
    if token.is_none() {
        warn!("{TOKEN_ENV} not set; provider requests are sent without a token");
    }
    let provider = FootballDataClient::new(FootballDataConfig {
        base_url: config.fixtures().base_url.clone(),
        token,
        timeout: config.fixtures().timeout,
    })
    .context("building fixtures client")?;

    let app_state = AppState::new(config, Arc::new(provider));
    snapshot_service::restore(&app_state).await;

    start_storage(app_state.clone()).await?;
    tokio::spawn(fixture_service::run_refresher(app_state.clone()));

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

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
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Install the storage backend selected by `STORE_BACKEND` (`mongo` by default).
async fn start_storage(state: SharedState) -> anyhow::Result<()> {
    let backend = env::var(STORE_BACKEND_ENV).unwrap_or_else(|_| "mongo".into());
    match backend.as_str() {
        "memory" => {
            info!("using in-memory storage backend");
            state.install_storage(Arc::new(MemoryStore::new())).await;
            Ok(())
        }
        "mongo" => start_mongo(state),
        other => anyhow::bail!("unknown {STORE_BACKEND_ENV} `{other}` (expected `mongo` or `memory`)"),
    }
}

#[cfg(feature = "mongo-store")]
fn start_mongo(state: SharedState) -> anyhow::Result<()> {
    use pollamania_back::{
        dao::{
            pool_store::{
                Storage,
                mongodb::{MongoConfig, MongoPoolStore},
            },
            storage::StorageError,
        },
        services::storage_supervisor,
    };

    tokio::spawn(storage_supervisor::run(state, || async {
        let config = MongoConfig::from_env().await?;
        let store = MongoPoolStore::connect(config).await?;
        Ok::<Arc<dyn Storage>, StorageError>(Arc::new(store))
    }));
    Ok(())
}

#[cfg(not(feature = "mongo-store"))]
fn start_mongo(_state: SharedState) -> anyhow::Result<()> {
    anyhow::bail!("built without the `mongo-store` feature; set {STORE_BACKEND_ENV}=memory")
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

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
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
}
