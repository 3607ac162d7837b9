// Document database backend.
//
// Tables:
// - core_documents: the core record, keyed by its fixed id
// - guild_documents: one JSON document per guild, keyed by guild id
//
// Every init/update is a single INSERT .. ON CONFLICT .. RETURNING statement,
// so the at-most-one-record-per-key rule is enforced by the database itself
// and holds across processes sharing the same database.

use crate::core::storage::storage_models::{validate_guild_id, validate_labels};
use crate::core::storage::storage_store::prepare_guild_record;
use crate::core::storage::{
    ConfigStore, CoreArrayField, CoreRecord, GuildArrayField, GuildRecord, RecordDefaults,
    StorageKind, StoreError, CORE_ID,
};
use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug)]
pub struct DocumentConfigStore {
    pool: Pool<Sqlite>,
    defaults: RecordDefaults,
}

impl DocumentConfigStore {
    /// Connect to `database_url` and register the record tables.
    ///
    /// The database must already exist unless the URL asks for creation
    /// (`?mode=rwc`); an unreachable target fails here, not on first use.
    pub async fn connect(
        database_url: &str,
        defaults: RecordDefaults,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let conn_str = if database_url.starts_with("sqlite:") {
            database_url.to_string()
        } else {
            format!("sqlite://{}", database_url)
        };

        let options = SqliteConnectOptions::from_str(&conn_str)?;
        let pool = SqlitePoolOptions::new()
            .acquire_timeout(timeout)
            .connect_with(options)
            .await?;

        let store = Self { pool, defaults };
        store.migrate().await?;
        Ok(store)
    }

    /// Create the record tables if they do not exist yet.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS core_documents (
                id TEXT PRIMARY KEY,
                document TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS guild_documents (
                guild_id TEXT PRIMARY KEY,
                document TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }
}

fn db_err(e: sqlx::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

/// `json_set` over a malformed stored document is bad data, not an outage.
fn update_err(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.message().contains("malformed JSON") {
            return StoreError::Corrupted(db.message().to_string());
        }
    }
    db_err(e)
}

fn encode<T: Serialize>(value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|e| StoreError::Corrupted(e.to_string()))
}

fn decode<T: DeserializeOwned>(row: &SqliteRow) -> Result<T, StoreError> {
    let document: String = row.try_get("document").map_err(db_err)?;
    serde_json::from_str(&document).map_err(|e| StoreError::Corrupted(e.to_string()))
}

#[async_trait]
impl ConfigStore for DocumentConfigStore {
    fn kind(&self) -> StorageKind {
        StorageKind::Document
    }

    fn defaults(&self) -> &RecordDefaults {
        &self.defaults
    }

    async fn fetch_core(&self) -> Result<Option<CoreRecord>, StoreError> {
        let row = sqlx::query("SELECT document FROM core_documents WHERE id = ?")
            .bind(CORE_ID)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(decode).transpose()
    }

    async fn fetch_guild(&self, guild_id: &str) -> Result<Option<GuildRecord>, StoreError> {
        let row = sqlx::query("SELECT document FROM guild_documents WHERE guild_id = ?")
            .bind(guild_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(decode).transpose()
    }

    async fn init_core(&self) -> Result<CoreRecord, StoreError> {
        // The no-op DO UPDATE makes RETURNING yield the existing row on conflict.
        let row = sqlx::query(
            r#"
            INSERT INTO core_documents (id, document) VALUES (?, ?)
            ON CONFLICT(id) DO UPDATE SET id = excluded.id
            RETURNING document
            "#,
        )
        .bind(CORE_ID)
        .bind(encode(&self.defaults.core_record())?)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        decode(&row)
    }

    async fn init_guild(&self, guild_id: &str) -> Result<GuildRecord, StoreError> {
        validate_guild_id(guild_id)?;
        let row = sqlx::query(
            r#"
            INSERT INTO guild_documents (guild_id, document) VALUES (?, ?)
            ON CONFLICT(guild_id) DO UPDATE SET guild_id = excluded.guild_id
            RETURNING document
            "#,
        )
        .bind(guild_id)
        .bind(encode(&self.defaults.guild_record(guild_id))?)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        decode(&row)
    }

    async fn update_core_field(
        &self,
        field: CoreArrayField,
        values: Vec<String>,
    ) -> Result<CoreRecord, StoreError> {
        validate_labels(field.as_str(), &values)?;
        let now = Utc::now();
        let mut inserted = self.defaults.core_record();
        inserted.set_field(field, values.clone());

        let row = sqlx::query(
            r#"
            INSERT INTO core_documents (id, document) VALUES (?, ?)
            ON CONFLICT(id) DO UPDATE SET
                document = json_set(core_documents.document, ?, json(?), '$.updatedAt', json(?))
            RETURNING document
            "#,
        )
        .bind(CORE_ID)
        .bind(encode(&inserted)?)
        .bind(format!("$.{}", field.as_str()))
        .bind(encode(&values)?)
        .bind(encode(&now)?)
        .fetch_one(&self.pool)
        .await
        .map_err(update_err)?;

        decode(&row)
    }

    async fn update_guild_field(
        &self,
        guild_id: &str,
        field: GuildArrayField,
        values: Vec<String>,
    ) -> Result<GuildRecord, StoreError> {
        validate_guild_id(guild_id)?;
        validate_labels(field.as_str(), &values)?;
        let now = Utc::now();
        let mut inserted = self.defaults.guild_record(guild_id);
        inserted.set_field(field, values.clone());

        let row = sqlx::query(
            r#"
            INSERT INTO guild_documents (guild_id, document) VALUES (?, ?)
            ON CONFLICT(guild_id) DO UPDATE SET
                document = json_set(guild_documents.document, ?, json(?), '$.updatedAt', json(?))
            RETURNING document
            "#,
        )
        .bind(guild_id)
        .bind(encode(&inserted)?)
        .bind(format!("$.{}", field.as_str()))
        .bind(encode(&values)?)
        .bind(encode(&now)?)
        .fetch_one(&self.pool)
        .await
        .map_err(update_err)?;

        decode(&row)
    }

    async fn save_record(&self, record: CoreRecord) -> Result<CoreRecord, StoreError> {
        record.validate()?;
        let row = sqlx::query(
            r#"
            INSERT INTO core_documents (id, document) VALUES (?, ?)
            ON CONFLICT(id) DO UPDATE SET document = excluded.document
            RETURNING document
            "#,
        )
        .bind(CORE_ID)
        .bind(encode(&record)?)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        decode(&row)
    }

    async fn save_guild_record(
        &self,
        guild_id: &str,
        record: GuildRecord,
    ) -> Result<GuildRecord, StoreError> {
        let record = prepare_guild_record(guild_id, record)?;
        let row = sqlx::query(
            r#"
            INSERT INTO guild_documents (guild_id, document) VALUES (?, ?)
            ON CONFLICT(guild_id) DO UPDATE SET document = excluded.document
            RETURNING document
            "#,
        )
        .bind(guild_id)
        .bind(encode(&record)?)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        decode(&row)
    }
}

#[cfg(test)]
impl DocumentConfigStore {
    /// (core rows, guild rows) currently stored.
    pub(crate) async fn record_counts(&self) -> (usize, usize) {
        let core: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM core_documents")
            .fetch_one(&self.pool)
            .await
            .unwrap();
        let guilds: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM guild_documents")
            .fetch_one(&self.pool)
            .await
            .unwrap();
        (core as usize, guilds as usize)
    }
}
