//! Insert the reference tournaments and matches into the catalog store.
//!
//! Uses MongoDB (`MONGO_URI`, `MONGO_DB`) unless `STORE_BACKEND=memory`, which only
//! exercises the seed against a throwaway store.

use std::env;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pollamania_back::{
    dao::pool_store::memory::MemoryStore,
    services::catalog_service::{self, SeedReport},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let report = match env::var("STORE_BACKEND").as_deref() {
        Ok("memory") => catalog_service::seed(&MemoryStore::new())
            .await
            .context("seeding in-memory catalog")?,
        _ => seed_mongo().await?,
    };

    info!(
        tournaments = report.tournaments_inserted,
        matches = report.matches_inserted,
        skipped = report.skipped,
        "catalog seed finished"
    );
    Ok(())
}

#[cfg(feature = "mongo-store")]
async fn seed_mongo() -> anyhow::Result<SeedReport> {
    use pollamania_back::dao::pool_store::mongodb::{MongoConfig, MongoPoolStore};

    let config = MongoConfig::from_env()
        .await
        .context("reading MongoDB configuration")?;
    let store = MongoPoolStore::connect(config)
        .await
        .context("connecting to MongoDB")?;
    catalog_service::seed(&store)
        .await
        .context("seeding MongoDB catalog")
}

#[cfg(not(feature = "mongo-store"))]
async fn seed_mongo() -> anyhow::Result<SeedReport> {
    anyhow::bail!("built without the `mongo-store` feature; set STORE_BACKEND=memory")
}
