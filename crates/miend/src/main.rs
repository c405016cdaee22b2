use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use miend::config::{Config, StorageBackend};
use miend::{engine, http, service::FaceService};
use mien_core::{LivenessGate, OnnxExtractor};
use mien_store::{FaceStore, LocalStore, RemoteStore};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env();
    tracing::info!(backend = ?config.storage_backend, "miend starting");

    let store: Arc<dyn FaceStore> = match config.storage_backend {
        StorageBackend::Local => Arc::new(LocalStore::open(&config.faces_dir).await?),
        StorageBackend::Remote => {
            tracing::warn!(
                "remote backend cannot enumerate identities; verification requests will be rejected"
            );
            Arc::new(RemoteStore::new(
                &config.remote_endpoint,
                &config.remote_bucket,
                Duration::from_secs(config.storage_timeout_secs),
            )?)
        }
    };

    // Fail fast if a model file is missing
    let extractor = OnnxExtractor::load(
        &config.detector_model_path(),
        &config.embedder_model_path(),
    )?;
    let gate = LivenessGate::new(config.texture_threshold);
    let engine = engine::spawn_engine(extractor, gate);

    let service = Arc::new(FaceService::new(engine, store, config.match_tolerance));
    let app = http::router(service);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "miend ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("miend shutting down");
        })
        .await?;

    Ok(())
}
