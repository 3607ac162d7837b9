// Entry point: picks the storage backend and makes sure the core record exists.
//
// This file's job is to:
// 1. Load configuration
// 2. Select the storage backend (falling back to the JSON file store)
// 3. Initialise the core record through the config service

use bot_config_store::core::storage::{ConfigService, StorageConfig};
use bot_config_store::infra::storage::select_backend;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let config = StorageConfig::from_env();
    tracing::debug!(?config, "Loaded storage configuration");

    let store = select_backend(&config).await?;
    let service = ConfigService::new(store);

    let core = service.core_config().await?;
    tracing::info!(
        backend = %service.store().kind(),
        banned_users = core.banned_users.len(),
        banned_guilds = core.banned_guilds.len(),
        "Config store ready"
    );

    Ok(())
}
