//! EDF Report Pipeline - Main Entry Point
//!
//! Reads one notification batch (JSON) from the file named by the first
//! argument, or from stdin, and processes it against the local object store.

use anyhow::Context;
use pipeline::{init_logging, EventHandler, NotificationBatch, PipelineConfig, DEFAULT_CONFIG_FILE};
use std::path::Path;
use std::sync::Arc;
use storage::{LocalObjectStore, ObjectStore};
use tokio::io::AsyncReadExt;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = PipelineConfig::load(Some(Path::new(DEFAULT_CONFIG_FILE)))
        .context("loading configuration")?;
    init_logging(&config)?;

    info!("=== EDF Report Pipeline v{} ===", env!("CARGO_PKG_VERSION"));

    let event = match std::env::args().nth(1) {
        Some(path) => tokio::fs::read(&path)
            .await
            .with_context(|| format!("reading event file {path}"))?,
        None => {
            let mut buf = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut buf)
                .await
                .context("reading event from stdin")?;
            buf
        }
    };
    let batch = NotificationBatch::from_json(&event)?;

    let store: Arc<dyn ObjectStore> = Arc::new(LocalObjectStore::new(&config.store_root));
    let handler = EventHandler::from_config(&config, store);

    for record in handler.handle(&batch).await? {
        println!("{}", serde_json::to_string(&record)?);
    }
    Ok(())
}
