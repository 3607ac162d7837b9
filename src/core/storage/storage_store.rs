// The storage contract (port). The infra layer provides the backends.

use super::storage_config::StorageKind;
use super::storage_models::{
    CoreArrayField, CoreRecord, GuildArrayField, GuildRecord, RecordDefaults,
};
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Stored data is corrupted: {0}")]
    Corrupted(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// Persistence for the core record and per-guild records.
///
/// Every backend honors the same contract, so callers never need to know
/// which one was selected at startup:
/// - `fetch_*` never creates; a missing record is `Ok(None)`, not an error.
/// - `init_*` is fetch-or-create with defaults and is atomic per key.
/// - `update_*_field` replaces the whole array and creates the record first
///   if it is missing, as one logical operation.
/// - `save_*` write the full record as given (blind overwrite, no
///   compare-and-swap).
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Which backend variant this is.
    fn kind(&self) -> StorageKind;

    /// Defaults this store fills new records with.
    fn defaults(&self) -> &RecordDefaults;

    async fn fetch_core(&self) -> Result<Option<CoreRecord>, StoreError>;

    async fn fetch_guild(&self, guild_id: &str) -> Result<Option<GuildRecord>, StoreError>;

    async fn init_core(&self) -> Result<CoreRecord, StoreError>;

    async fn init_guild(&self, guild_id: &str) -> Result<GuildRecord, StoreError>;

    async fn update_core_field(
        &self,
        field: CoreArrayField,
        values: Vec<String>,
    ) -> Result<CoreRecord, StoreError>;

    async fn update_guild_field(
        &self,
        guild_id: &str,
        field: GuildArrayField,
        values: Vec<String>,
    ) -> Result<GuildRecord, StoreError>;

    /// Write back the full state of the core record.
    async fn save_record(&self, record: CoreRecord) -> Result<CoreRecord, StoreError>;

    /// Write a full guild record under `guild_id`, creating it if absent.
    ///
    /// An empty `record.guild_id` is filled in with `guild_id`; a different
    /// non-empty one is rejected since guild ids never change.
    async fn save_guild_record(
        &self,
        guild_id: &str,
        record: GuildRecord,
    ) -> Result<GuildRecord, StoreError>;
}

/// Shared pre-write check for `save_guild_record`.
pub fn prepare_guild_record(
    guild_id: &str,
    mut record: GuildRecord,
) -> Result<GuildRecord, StoreError> {
    super::storage_models::validate_guild_id(guild_id)?;
    if record.guild_id.is_empty() {
        record.guild_id = guild_id.to_string();
    } else if record.guild_id != guild_id {
        return Err(StoreError::Validation(format!(
            "record belongs to guild {} and cannot be saved under {}",
            record.guild_id, guild_id
        )));
    }
    record.validate()?;
    Ok(record)
}
