// Record schemas shared by every backend.
//
// Both backends serialize these structs with the same serde attributes, so a
// document written by the JSON store can be read back by the document
// database store and vice versa.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::storage_store::StoreError;

/// Key of the single core record.
pub const CORE_ID: &str = "1";

// ============================================================================
// RECORDS
// ============================================================================

/// Framework-wide configuration. Exactly zero or one of these exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreRecord {
    pub id: String,
    #[serde(default)]
    pub prefix: Vec<String>,
    #[serde(default)]
    pub banned_users: Vec<String>,
    #[serde(default)]
    pub banned_guilds: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-guild configuration, keyed by `guildID`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuildRecord {
    #[serde(rename = "guildID")]
    pub guild_id: String,
    #[serde(default)]
    pub prefix: Vec<String>,
    /// Module labels enabled for the guild.
    #[serde(default)]
    pub modules: Vec<String>,
    #[serde(default)]
    pub commands: Vec<String>,
    #[serde(default)]
    pub events: Vec<String>,
    #[serde(default)]
    pub ignored_users: Vec<String>,
    #[serde(default)]
    pub ignored_roles: Vec<String>,
    #[serde(default)]
    pub ignored_channels: Vec<String>,
    #[serde(default)]
    pub mod_roles: Vec<String>,
    #[serde(default)]
    pub mod_users: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// UPDATABLE FIELDS
// ============================================================================

/// Array fields of the core record that can be replaced wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoreArrayField {
    Prefix,
    BannedUsers,
    BannedGuilds,
}

impl CoreArrayField {
    /// Name of the field in the persisted document.
    pub fn as_str(&self) -> &'static str {
        match self {
            CoreArrayField::Prefix => "prefix",
            CoreArrayField::BannedUsers => "bannedUsers",
            CoreArrayField::BannedGuilds => "bannedGuilds",
        }
    }
}

impl fmt::Display for CoreArrayField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Array fields of a guild record that can be replaced wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuildArrayField {
    Prefix,
    Modules,
    Commands,
    Events,
    IgnoredUsers,
    IgnoredRoles,
    IgnoredChannels,
    ModRoles,
    ModUsers,
}

impl GuildArrayField {
    pub fn as_str(&self) -> &'static str {
        match self {
            GuildArrayField::Prefix => "prefix",
            GuildArrayField::Modules => "modules",
            GuildArrayField::Commands => "commands",
            GuildArrayField::Events => "events",
            GuildArrayField::IgnoredUsers => "ignoredUsers",
            GuildArrayField::IgnoredRoles => "ignoredRoles",
            GuildArrayField::IgnoredChannels => "ignoredChannels",
            GuildArrayField::ModRoles => "modRoles",
            GuildArrayField::ModUsers => "modUsers",
        }
    }
}

impl fmt::Display for GuildArrayField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl CoreRecord {
    pub fn field(&self, field: CoreArrayField) -> &[String] {
        match field {
            CoreArrayField::Prefix => &self.prefix,
            CoreArrayField::BannedUsers => &self.banned_users,
            CoreArrayField::BannedGuilds => &self.banned_guilds,
        }
    }

    /// Replace the whole array; the previous contents are discarded.
    pub fn set_field(&mut self, field: CoreArrayField, values: Vec<String>) {
        match field {
            CoreArrayField::Prefix => self.prefix = values,
            CoreArrayField::BannedUsers => self.banned_users = values,
            CoreArrayField::BannedGuilds => self.banned_guilds = values,
        }
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if self.id != CORE_ID {
            return Err(StoreError::Validation(format!(
                "core record id must be \"{}\", got \"{}\"",
                CORE_ID, self.id
            )));
        }
        for field in [
            CoreArrayField::Prefix,
            CoreArrayField::BannedUsers,
            CoreArrayField::BannedGuilds,
        ] {
            validate_labels(field.as_str(), self.field(field))?;
        }
        Ok(())
    }
}

impl GuildRecord {
    pub fn field(&self, field: GuildArrayField) -> &[String] {
        match field {
            GuildArrayField::Prefix => &self.prefix,
            GuildArrayField::Modules => &self.modules,
            GuildArrayField::Commands => &self.commands,
            GuildArrayField::Events => &self.events,
            GuildArrayField::IgnoredUsers => &self.ignored_users,
            GuildArrayField::IgnoredRoles => &self.ignored_roles,
            GuildArrayField::IgnoredChannels => &self.ignored_channels,
            GuildArrayField::ModRoles => &self.mod_roles,
            GuildArrayField::ModUsers => &self.mod_users,
        }
    }

    /// Replace the whole array; the previous contents are discarded.
    pub fn set_field(&mut self, field: GuildArrayField, values: Vec<String>) {
        let slot = match field {
            GuildArrayField::Prefix => &mut self.prefix,
            GuildArrayField::Modules => &mut self.modules,
            GuildArrayField::Commands => &mut self.commands,
            GuildArrayField::Events => &mut self.events,
            GuildArrayField::IgnoredUsers => &mut self.ignored_users,
            GuildArrayField::IgnoredRoles => &mut self.ignored_roles,
            GuildArrayField::IgnoredChannels => &mut self.ignored_channels,
            GuildArrayField::ModRoles => &mut self.mod_roles,
            GuildArrayField::ModUsers => &mut self.mod_users,
        };
        *slot = values;
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        validate_guild_id(&self.guild_id)?;
        for field in GuildArrayField::ALL {
            validate_labels(field.as_str(), self.field(field))?;
        }
        Ok(())
    }
}

impl GuildArrayField {
    pub const ALL: [GuildArrayField; 9] = [
        GuildArrayField::Prefix,
        GuildArrayField::Modules,
        GuildArrayField::Commands,
        GuildArrayField::Events,
        GuildArrayField::IgnoredUsers,
        GuildArrayField::IgnoredRoles,
        GuildArrayField::IgnoredChannels,
        GuildArrayField::ModRoles,
        GuildArrayField::ModUsers,
    ];
}

pub fn validate_guild_id(guild_id: &str) -> Result<(), StoreError> {
    if guild_id.trim().is_empty() {
        return Err(StoreError::Validation(
            "guild id must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Every entry of an array field must be a non-blank string.
pub fn validate_labels(field: &str, values: &[String]) -> Result<(), StoreError> {
    if let Some(pos) = values.iter().position(|v| v.trim().is_empty()) {
        return Err(StoreError::Validation(format!(
            "{field}[{pos}] must not be blank"
        )));
    }
    Ok(())
}

// ============================================================================
// DEFAULTS
// ============================================================================

/// Default field values for freshly created records.
///
/// Handed to each backend when it is constructed; every array field that is
/// not listed here starts out empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordDefaults {
    pub core_prefix: Vec<String>,
    pub guild_prefix: Vec<String>,
}

impl RecordDefaults {
    pub fn core_record(&self) -> CoreRecord {
        let now = Utc::now();
        CoreRecord {
            id: CORE_ID.to_string(),
            prefix: self.core_prefix.clone(),
            banned_users: Vec::new(),
            banned_guilds: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn guild_record(&self, guild_id: &str) -> GuildRecord {
        let now = Utc::now();
        GuildRecord {
            guild_id: guild_id.to_string(),
            prefix: self.guild_prefix.clone(),
            modules: Vec::new(),
            commands: Vec::new(),
            events: Vec::new(),
            ignored_users: Vec::new(),
            ignored_roles: Vec::new(),
            ignored_channels: Vec::new(),
            mod_roles: Vec::new(),
            mod_users: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Build a guild record from a partial JSON document.
    ///
    /// Fields missing from `document` take their default values; fields of
    /// the wrong type are rejected. The key is always `guild_id`.
    pub fn guild_from_document(
        &self,
        guild_id: &str,
        document: serde_json::Value,
    ) -> Result<GuildRecord, StoreError> {
        validate_guild_id(guild_id)?;
        let serde_json::Value::Object(fields) = document else {
            return Err(StoreError::Validation(
                "guild document must be a JSON object".to_string(),
            ));
        };

        let mut merged = match serde_json::to_value(self.guild_record(guild_id)) {
            Ok(serde_json::Value::Object(map)) => map,
            Ok(other) => {
                return Err(StoreError::Corrupted(format!(
                    "default guild record is not an object: {other}"
                )))
            }
            Err(e) => return Err(StoreError::Corrupted(e.to_string())),
        };
        for (key, value) in fields {
            if key == "guildID" {
                continue;
            }
            merged.insert(key, value);
        }

        let record: GuildRecord = serde_json::from_value(serde_json::Value::Object(merged))
            .map_err(|e| StoreError::Validation(e.to_string()))?;
        record.validate()?;
        Ok(record)
    }
}
