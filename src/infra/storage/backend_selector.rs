// Picks the storage backend once at startup.

use super::document_store::DocumentConfigStore;
use super::json_store::JsonConfigStore;
use crate::core::storage::{ConfigStore, StorageConfig, StorageKind, StoreError};
use anyhow::Context;
use std::sync::Arc;

/// Build the backend named by `config.kind`.
///
/// When the document database cannot be constructed (no URL, connection
/// refused, table setup failed) the failure is logged and the JSON file
/// store is used instead. That is the only fallback; errors from the
/// returned store are never retried.
pub async fn select_backend(config: &StorageConfig) -> Result<Arc<dyn ConfigStore>, StoreError> {
    let store: Arc<dyn ConfigStore> = match config.kind {
        StorageKind::Document => match connect_document_store(config).await {
            Ok(store) => Arc::new(store),
            Err(err) => {
                tracing::warn!(
                    "Document database unavailable ({:#}), using JSON file storage instead",
                    err
                );
                Arc::new(open_json_store(config).await?)
            }
        },
        StorageKind::File => Arc::new(open_json_store(config).await?),
    };

    tracing::info!("Selected storage backend: {}", store.kind());
    Ok(store)
}

async fn connect_document_store(config: &StorageConfig) -> anyhow::Result<DocumentConfigStore> {
    let url = config
        .database_url
        .as_deref()
        .context("STORAGE_DATABASE_URL is not set")?;

    DocumentConfigStore::connect(url, config.defaults.clone(), config.connect_timeout)
        .await
        .with_context(|| format!("failed to connect to {}", redact_url(url)))
}

/// Keep only scheme and host so credentials, paths and query options
/// never reach the logs.
fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return "<redacted>".to_string();
    };
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host = authority.rsplit('@').next().unwrap_or_default();
    if host.is_empty() {
        format!("{}://<redacted>", scheme)
    } else {
        format!("{}://{}", scheme, host)
    }
}

async fn open_json_store(config: &StorageConfig) -> Result<JsonConfigStore, StoreError> {
    JsonConfigStore::open(config.json_path.clone(), config.defaults.clone()).await
}
