use anyhow::{Context, Result};
use std::sync::Arc;
use taste_cloud::{
    load_sdk_config, AwsSettings, HttpFetcher, ImageCrateResizer, RekognitionCollection,
    S3ObjectStore,
};
use taste_core::provision::ResourceConfig;
use taste_core::{Clients, Taste};
use tracing_subscriber::EnvFilter;

mod config;
mod dbus_interface;
mod store;

use config::{Bus, Config};
use dbus_interface::TasteService;
use store::SqliteStore;

const BUS_NAME: &str = "org.getmeadate.Taste1";
const OBJECT_PATH: &str = "/org/getmeadate/Taste1";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("tasted starting");

    let config = Config::from_env()?;

    let sdk = load_sdk_config(&AwsSettings {
        region: config.region.clone(),
        access_key_id: config.access_key_id.clone(),
        secret_access_key: config.secret_access_key.clone(),
        operation_timeout: config.request_timeout,
    })
    .await;

    let db = Arc::new(
        SqliteStore::open(&config.db_path)
            .await
            .context("failed to open database")?,
    );

    let clients = Clients {
        objects: Arc::new(S3ObjectStore::new(&sdk)),
        faces: Arc::new(RekognitionCollection::new(&sdk, config.face_match_threshold)),
        settings: db.clone(),
        messages: db,
        fetcher: Arc::new(HttpFetcher::new(config.request_timeout)?),
        resizer: Arc::new(ImageCrateResizer),
    };

    let resources = ResourceConfig {
        bucket: config.bucket_name.clone(),
        collection: config.collection_name.clone(),
    };
    let taste = Arc::new(
        Taste::start(clients, &resources)
            .await
            .context("failed to provision bucket and collection")?,
    );

    let builder = match config.bus {
        Bus::Session => zbus::connection::Builder::session()?,
        Bus::System => zbus::connection::Builder::system()?,
    };
    let _conn = builder
        .name(BUS_NAME)?
        .serve_at(OBJECT_PATH, TasteService::new(taste))?
        .build()
        .await
        .context("failed to register on D-Bus")?;

    tracing::info!(bus = ?config.bus, name = BUS_NAME, "tasted ready");

    tokio::signal::ctrl_c().await?;
    tracing::info!("tasted shutting down");

    Ok(())
}
