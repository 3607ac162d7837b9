// Intent-level operations on top of the storage contract.
// Holds no copy of any record: every call goes to the store.

use super::storage_models::{CoreArrayField, CoreRecord, GuildArrayField, GuildRecord};
use super::storage_store::{ConfigStore, StoreError};

pub struct ConfigService<S: ConfigStore + ?Sized> {
    store: std::sync::Arc<S>,
}

impl<S: ConfigStore + ?Sized> ConfigService<S> {
    pub fn new(store: std::sync::Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Core record, created with defaults on first access.
    pub async fn core_config(&self) -> Result<CoreRecord, StoreError> {
        self.store.init_core().await
    }

    /// Guild record, created with defaults on first access.
    pub async fn guild_config(&self, guild_id: &str) -> Result<GuildRecord, StoreError> {
        self.store.init_guild(guild_id).await
    }

    pub async fn is_user_banned(&self, user_id: &str) -> Result<bool, StoreError> {
        Ok(self
            .store
            .fetch_core()
            .await?
            .is_some_and(|core| core.banned_users.iter().any(|u| u == user_id)))
    }

    pub async fn is_guild_banned(&self, guild_id: &str) -> Result<bool, StoreError> {
        Ok(self
            .store
            .fetch_core()
            .await?
            .is_some_and(|core| core.banned_guilds.iter().any(|g| g == guild_id)))
    }

    pub async fn ban_user(&self, user_id: &str) -> Result<CoreRecord, StoreError> {
        self.toggle_core_entry(CoreArrayField::BannedUsers, user_id, true)
            .await
    }

    pub async fn unban_user(&self, user_id: &str) -> Result<CoreRecord, StoreError> {
        self.toggle_core_entry(CoreArrayField::BannedUsers, user_id, false)
            .await
    }

    pub async fn ban_guild(&self, guild_id: &str) -> Result<CoreRecord, StoreError> {
        self.toggle_core_entry(CoreArrayField::BannedGuilds, guild_id, true)
            .await
    }

    pub async fn unban_guild(&self, guild_id: &str) -> Result<CoreRecord, StoreError> {
        self.toggle_core_entry(CoreArrayField::BannedGuilds, guild_id, false)
            .await
    }

    pub async fn set_guild_prefixes(
        &self,
        guild_id: &str,
        prefixes: Vec<String>,
    ) -> Result<GuildRecord, StoreError> {
        self.store
            .update_guild_field(guild_id, GuildArrayField::Prefix, prefixes)
            .await
    }

    /// Add or remove `label` in one of the guild's label lists
    /// (modules, commands, events, ...).
    pub async fn set_enabled(
        &self,
        guild_id: &str,
        field: GuildArrayField,
        label: &str,
        enabled: bool,
    ) -> Result<GuildRecord, StoreError> {
        let guild = self.store.init_guild(guild_id).await?;
        let current = guild.field(field);
        let present = current.iter().any(|l| l == label);
        if present == enabled {
            return Ok(guild);
        }

        let next = toggled(current, label, enabled);
        self.store.update_guild_field(guild_id, field, next).await
    }

    /// Save a partial guild document; missing fields take the store's defaults.
    pub async fn import_guild_document(
        &self,
        guild_id: &str,
        document: serde_json::Value,
    ) -> Result<GuildRecord, StoreError> {
        let record = self
            .store
            .defaults()
            .guild_from_document(guild_id, document)?;
        self.store.save_guild_record(guild_id, record).await
    }

    async fn toggle_core_entry(
        &self,
        field: CoreArrayField,
        entry: &str,
        present: bool,
    ) -> Result<CoreRecord, StoreError> {
        let core = self.store.init_core().await?;
        let current = core.field(field);
        if current.iter().any(|e| e == entry) == present {
            return Ok(core);
        }

        tracing::info!(%field, entry, present, "Updating core list");
        let next = toggled(current, entry, present);
        self.store.update_core_field(field, next).await
    }
}

fn toggled(current: &[String], entry: &str, present: bool) -> Vec<String> {
    if present {
        let mut next = current.to_vec();
        next.push(entry.to_string());
        next
    } else {
        current.iter().filter(|e| *e != entry).cloned().collect()
    }
}
