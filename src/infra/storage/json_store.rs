use crate::core::storage::storage_models::{validate_guild_id, validate_labels};
use crate::core::storage::storage_store::prepare_guild_record;
use crate::core::storage::{
    ConfigStore, CoreArrayField, CoreRecord, GuildArrayField, GuildRecord, RecordDefaults,
    StorageKind, StoreError, CORE_ID,
};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::{RwLock, RwLockWriteGuard};

/// On-disk layout: one collection per record kind, keyed by `id` / `guildID`.
/// { "core": { "1": CoreRecord }, "guilds": { guild_id: GuildRecord }, "revision": n }
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct JsonStoreData {
    #[serde(default)]
    core: BTreeMap<String, CoreRecord>,
    #[serde(default)]
    guilds: BTreeMap<String, GuildRecord>,
    /// Bumped on every successful write.
    #[serde(default)]
    revision: u64,
}

/// File-backed store. Always constructible.
///
/// The whole collection lives in memory behind a `RwLock`. Writers hold the
/// write guard across mutate, persist and commit, so there is only ever one
/// writer and the cache is only updated after the file write succeeded.
///
/// The file is read once in `open` and every write rewrites it from the
/// in-memory copy, so one store instance must own the path. A second store
/// or process on the same file will silently overwrite this one's records.
pub struct JsonConfigStore {
    path: PathBuf,
    defaults: RecordDefaults,
    cache: RwLock<JsonStoreData>,
}

impl JsonConfigStore {
    /// Load the store from `path`. A missing file is an empty store.
    pub async fn open(
        path: impl Into<PathBuf>,
        defaults: RecordDefaults,
    ) -> Result<Self, StoreError> {
        let path = path.into();
        let data = match fs::read_to_string(&path).await {
            Ok(text) if text.trim().is_empty() => JsonStoreData::default(),
            Ok(text) => serde_json::from_str(&text).map_err(|e| {
                StoreError::Corrupted(format!("{}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => JsonStoreData::default(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(
            path = %path.display(),
            guilds = data.guilds.len(),
            revision = data.revision,
            "Opened JSON config store"
        );

        Ok(Self {
            path,
            defaults,
            cache: RwLock::new(data),
        })
    }

    /// Write `data` to a sibling temp file and rename it over the target.
    async fn persist(&self, data: &JsonStoreData) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let text = serde_json::to_string_pretty(data)
            .map_err(|e| StoreError::Corrupted(e.to_string()))?;
        let mut tmp_name = self.path.clone().into_os_string();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        fs::write(&tmp_path, text).await?;
        if let Err(e) = fs::rename(&tmp_path, &self.path).await {
            if let Err(cleanup) = fs::remove_file(&tmp_path).await {
                tracing::warn!(path = %tmp_path.display(), "Failed to remove temp file: {}", cleanup);
            }
            return Err(e.into());
        }
        Ok(())
    }

    /// Persist `next` and, only if that worked, make it the cached state.
    async fn commit(
        &self,
        cache: &mut RwLockWriteGuard<'_, JsonStoreData>,
        mut next: JsonStoreData,
    ) -> Result<(), StoreError> {
        next.revision = cache.revision + 1;
        self.persist(&next).await?;
        **cache = next;
        Ok(())
    }
}

#[async_trait]
impl ConfigStore for JsonConfigStore {
    fn kind(&self) -> StorageKind {
        StorageKind::File
    }

    fn defaults(&self) -> &RecordDefaults {
        &self.defaults
    }

    async fn fetch_core(&self) -> Result<Option<CoreRecord>, StoreError> {
        let cache = self.cache.read().await;
        Ok(cache.core.get(CORE_ID).cloned())
    }

    async fn fetch_guild(&self, guild_id: &str) -> Result<Option<GuildRecord>, StoreError> {
        let cache = self.cache.read().await;
        Ok(cache.guilds.get(guild_id).cloned())
    }

    async fn init_core(&self) -> Result<CoreRecord, StoreError> {
        let mut cache = self.cache.write().await;
        if let Some(existing) = cache.core.get(CORE_ID) {
            return Ok(existing.clone());
        }

        let record = self.defaults.core_record();
        let mut next = cache.clone();
        next.core.insert(CORE_ID.to_string(), record.clone());
        self.commit(&mut cache, next).await?;
        tracing::info!("Created default core record");
        Ok(record)
    }

    async fn init_guild(&self, guild_id: &str) -> Result<GuildRecord, StoreError> {
        validate_guild_id(guild_id)?;
        let mut cache = self.cache.write().await;
        if let Some(existing) = cache.guilds.get(guild_id) {
            return Ok(existing.clone());
        }

        let record = self.defaults.guild_record(guild_id);
        let mut next = cache.clone();
        next.guilds.insert(guild_id.to_string(), record.clone());
        self.commit(&mut cache, next).await?;
        tracing::info!(guild_id, "Created default guild record");
        Ok(record)
    }

    async fn update_core_field(
        &self,
        field: CoreArrayField,
        values: Vec<String>,
    ) -> Result<CoreRecord, StoreError> {
        validate_labels(field.as_str(), &values)?;
        let mut cache = self.cache.write().await;
        let mut next = cache.clone();
        let record = next
            .core
            .entry(CORE_ID.to_string())
            .or_insert_with(|| self.defaults.core_record());
        record.set_field(field, values);
        record.updated_at = Utc::now();
        let updated = record.clone();

        self.commit(&mut cache, next).await?;
        Ok(updated)
    }

    async fn update_guild_field(
        &self,
        guild_id: &str,
        field: GuildArrayField,
        values: Vec<String>,
    ) -> Result<GuildRecord, StoreError> {
        validate_guild_id(guild_id)?;
        validate_labels(field.as_str(), &values)?;
        let mut cache = self.cache.write().await;
        let mut next = cache.clone();
        let record = next
            .guilds
            .entry(guild_id.to_string())
            .or_insert_with(|| self.defaults.guild_record(guild_id));
        record.set_field(field, values);
        record.updated_at = Utc::now();
        let updated = record.clone();

        self.commit(&mut cache, next).await?;
        Ok(updated)
    }

    async fn save_record(&self, record: CoreRecord) -> Result<CoreRecord, StoreError> {
        record.validate()?;
        let mut cache = self.cache.write().await;
        let mut next = cache.clone();
        next.core.insert(CORE_ID.to_string(), record.clone());
        self.commit(&mut cache, next).await?;
        Ok(record)
    }

    async fn save_guild_record(
        &self,
        guild_id: &str,
        record: GuildRecord,
    ) -> Result<GuildRecord, StoreError> {
        let record = prepare_guild_record(guild_id, record)?;
        let mut cache = self.cache.write().await;
        let mut next = cache.clone();
        next.guilds.insert(guild_id.to_string(), record.clone());
        self.commit(&mut cache, next).await?;
        Ok(record)
    }
}

#[cfg(test)]
impl JsonConfigStore {
    /// (core records, guild records) currently stored.
    pub(crate) async fn record_counts(&self) -> (usize, usize) {
        let cache = self.cache.read().await;
        (cache.core.len(), cache.guilds.len())
    }
}
