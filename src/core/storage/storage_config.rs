use super::storage_models::RecordDefaults;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_JSON_PATH: &str = "data/bot_config.json";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Which storage backend to use, as read from `STORAGE_KIND`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageKind {
    /// Discriminant `0`. Also the default and the fallback target.
    #[default]
    File,
    /// Discriminant `1`.
    Document,
}

impl StorageKind {
    /// Unknown discriminants select the file backend.
    pub fn from_discriminant(value: u8) -> Self {
        match value {
            1 => StorageKind::Document,
            _ => StorageKind::File,
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::File => f.write_str("JSON file"),
            StorageKind::Document => f.write_str("document database"),
        }
    }
}

/// Everything the backend selector needs, passed in explicitly.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub kind: StorageKind,
    pub json_path: PathBuf,
    pub database_url: Option<String>,
    pub connect_timeout: Duration,
    pub defaults: RecordDefaults,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            kind: StorageKind::File,
            json_path: PathBuf::from(DEFAULT_JSON_PATH),
            database_url: None,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            defaults: RecordDefaults::default(),
        }
    }
}

impl StorageConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup (env vars, a map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let kind = match lookup("STORAGE_KIND") {
            Some(raw) => match raw.trim().parse::<u8>() {
                Ok(value) => StorageKind::from_discriminant(value),
                Err(_) => {
                    tracing::debug!("Unrecognized STORAGE_KIND {:?}, using file storage", raw);
                    StorageKind::File
                }
            },
            None => StorageKind::File,
        };

        let json_path = lookup("STORAGE_JSON_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_JSON_PATH));

        let database_url = lookup("STORAGE_DATABASE_URL").filter(|url| !url.trim().is_empty());

        let connect_timeout = lookup("STORAGE_CONNECT_TIMEOUT_SECS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS));

        let prefix: Vec<String> = lookup("STORAGE_DEFAULT_PREFIX")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            kind,
            json_path,
            database_url,
            connect_timeout,
            defaults: RecordDefaults {
                core_prefix: prefix.clone(),
                guild_prefix: prefix,
            },
        }
    }
}
