// Behaviour every backend must share. Each case runs against both stores.

use super::{DocumentConfigStore, JsonConfigStore};
use crate::core::storage::{
    ConfigStore, CoreArrayField, GuildArrayField, RecordDefaults, StoreError, CORE_ID,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::task::JoinSet;

async fn backends() -> Vec<(TempDir, Arc<dyn ConfigStore>)> {
    let json_dir = TempDir::new().unwrap();
    let json = JsonConfigStore::open(json_dir.path().join("config.json"), RecordDefaults::default())
        .await
        .unwrap();

    let db_dir = TempDir::new().unwrap();
    let url = format!("sqlite://{}?mode=rwc", db_dir.path().join("config.db").display());
    let document =
        DocumentConfigStore::connect(&url, RecordDefaults::default(), Duration::from_secs(5))
            .await
            .unwrap();

    vec![
        (json_dir, Arc::new(json) as Arc<dyn ConfigStore>),
        (db_dir, Arc::new(document) as Arc<dyn ConfigStore>),
    ]
}

#[tokio::test]
async fn test_unknown_guild_is_absent_then_initialised_with_defaults() {
    for (_dir, store) in backends().await {
        assert!(store.fetch_guild("1001").await.unwrap().is_none());

        let guild = store.init_guild("1001").await.unwrap();
        assert_eq!(guild.guild_id, "1001");
        for field in GuildArrayField::ALL {
            assert!(guild.field(field).is_empty(), "{}: {field}", store.kind());
        }
        assert_eq!(store.fetch_guild("1001").await.unwrap(), Some(guild));
    }
}

#[tokio::test]
async fn test_init_guild_is_idempotent() {
    for (_dir, store) in backends().await {
        let first = store.init_guild("2002").await.unwrap();
        let second = store.init_guild("2002").await.unwrap();
        assert_eq!(first, second, "{}", store.kind());
    }
}

#[tokio::test]
async fn test_init_does_not_reset_existing_record() {
    for (_dir, store) in backends().await {
        store
            .update_guild_field("2003", GuildArrayField::Commands, vec!["ping".into()])
            .await
            .unwrap();
        let guild = store.init_guild("2003").await.unwrap();
        assert_eq!(guild.commands, vec!["ping"], "{}", store.kind());
    }
}

#[tokio::test]
async fn test_update_creates_missing_guild() {
    for (_dir, store) in backends().await {
        let guild = store
            .update_guild_field("3003", GuildArrayField::Prefix, vec!["!".into(), "?".into()])
            .await
            .unwrap();

        assert_eq!(guild.prefix, vec!["!", "?"]);
        assert!(guild.modules.is_empty());
        assert!(guild.commands.is_empty());
        assert!(guild.events.is_empty());
        assert_eq!(store.fetch_guild("3003").await.unwrap(), Some(guild));
    }
}

#[tokio::test]
async fn test_update_replaces_wholesale() {
    for (_dir, store) in backends().await {
        store
            .update_guild_field("4004", GuildArrayField::Prefix, vec!["!".into(), "?".into()])
            .await
            .unwrap();
        let guild = store
            .update_guild_field("4004", GuildArrayField::Prefix, Vec::new())
            .await
            .unwrap();
        assert!(guild.prefix.is_empty(), "{}", store.kind());

        let guild = store
            .update_guild_field("4004", GuildArrayField::Modules, vec!["Fun".into()])
            .await
            .unwrap();
        let guild_after = store
            .update_guild_field("4004", GuildArrayField::Modules, vec!["Core".into()])
            .await
            .unwrap();
        assert_eq!(guild.modules, vec!["Fun"]);
        assert_eq!(guild_after.modules, vec!["Core"]);
    }
}

#[tokio::test]
async fn test_init_core_defaults_and_idempotence() {
    for (_dir, store) in backends().await {
        assert!(store.fetch_core().await.unwrap().is_none());

        let core = store.init_core().await.unwrap();
        assert_eq!(core.id, CORE_ID);
        assert!(core.banned_users.is_empty());
        assert!(core.banned_guilds.is_empty());

        let again = store.init_core().await.unwrap();
        assert_eq!(core, again, "{}", store.kind());
    }
}

#[tokio::test]
async fn test_update_core_fields() {
    for (_dir, store) in backends().await {
        let core = store
            .update_core_field(CoreArrayField::BannedUsers, vec!["u1".into(), "u2".into()])
            .await
            .unwrap();
        assert_eq!(core.banned_users, vec!["u1", "u2"]);
        assert!(core.banned_guilds.is_empty());

        let core = store
            .update_core_field(CoreArrayField::BannedGuilds, vec!["g1".into()])
            .await
            .unwrap();
        assert_eq!(core.banned_users, vec!["u1", "u2"]);
        assert_eq!(core.banned_guilds, vec!["g1"]);
    }
}

#[tokio::test]
async fn test_save_guild_record_roundtrip() {
    for (_dir, store) in backends().await {
        let mut record = RecordDefaults::default().guild_record("5005");
        record.prefix = vec!["$".into()];
        record.modules = vec!["Core".into(), "Music".into()];
        record.events = vec!["guildMemberAdd".into()];
        record.mod_roles = vec!["42".into()];

        let saved = store
            .save_guild_record("5005", record.clone())
            .await
            .unwrap();
        assert_eq!(saved, record);
        assert_eq!(
            store.fetch_guild("5005").await.unwrap(),
            Some(record),
            "{}",
            store.kind()
        );
    }
}

#[tokio::test]
async fn test_save_guild_record_fills_empty_id() {
    for (_dir, store) in backends().await {
        let mut record = RecordDefaults::default().guild_record("");
        record.commands = vec!["help".into()];

        let saved = store.save_guild_record("5006", record).await.unwrap();
        assert_eq!(saved.guild_id, "5006");
        assert_eq!(saved.commands, vec!["help"]);
    }
}

#[tokio::test]
async fn test_save_record_writes_all_fields() {
    for (_dir, store) in backends().await {
        let mut core = store.init_core().await.unwrap();
        core.prefix = vec!["a!".into()];
        core.banned_users = vec!["u9".into()];
        core.banned_guilds = vec!["g9".into()];

        let saved = store.save_record(core.clone()).await.unwrap();
        assert_eq!(saved, core);
        assert_eq!(store.fetch_core().await.unwrap(), Some(core));
    }
}

#[tokio::test]
async fn test_validation_errors() {
    for (_dir, store) in backends().await {
        let err = store.init_guild("  ").await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));

        let err = store
            .update_guild_field("6006", GuildArrayField::Prefix, vec!["".into()])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        // Rejected writes never create the record
        assert!(store.fetch_guild("6006").await.unwrap().is_none());

        let other = RecordDefaults::default().guild_record("7007");
        let err = store.save_guild_record("6006", other).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));

        let mut core = RecordDefaults::default().core_record();
        core.id = "2".into();
        let err = store.save_record(core).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(store.fetch_core().await.unwrap().is_none());
    }
}

#[tokio::test]
async fn test_records_are_interchangeable_between_backends() {
    let stores = backends().await;
    let (_, json) = &stores[0];
    let (_, document) = &stores[1];

    let record = json
        .update_guild_field("8008", GuildArrayField::Events, vec!["ready".into()])
        .await
        .unwrap();
    document
        .save_guild_record("8008", record.clone())
        .await
        .unwrap();

    assert_eq!(document.fetch_guild("8008").await.unwrap(), Some(record));
}

/// Fire a mix of init and update calls at one missing guild and at the
/// missing core record, all at once. Every call must succeed.
async fn race_upserts(store: Arc<dyn ConfigStore>) {
    let mut tasks = JoinSet::new();
    for i in 0..32 {
        let store = Arc::clone(&store);
        tasks.spawn(async move {
            match i % 4 {
                0 => store.init_guild("9009").await.map(|_| ()),
                1 => store
                    .update_guild_field("9009", GuildArrayField::Modules, vec![format!("m{i}")])
                    .await
                    .map(|_| ()),
                2 => store.init_core().await.map(|_| ()),
                _ => store
                    .update_core_field(CoreArrayField::BannedUsers, vec![format!("u{i}")])
                    .await
                    .map(|_| ()),
            }
        });
    }

    let mut errors = 0;
    while let Some(joined) = tasks.join_next().await {
        if joined.unwrap().is_err() {
            errors += 1;
        }
    }
    assert_eq!(errors, 0, "{}", store.kind());

    // The last update won: each list holds exactly one of the written values
    let guild = store.fetch_guild("9009").await.unwrap().unwrap();
    assert_eq!(guild.modules.len(), 1);
    let core = store.fetch_core().await.unwrap().unwrap();
    assert_eq!(core.banned_users.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_upserts_create_one_record_json() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(
        JsonConfigStore::open(dir.path().join("config.json"), RecordDefaults::default())
            .await
            .unwrap(),
    );

    race_upserts(store.clone()).await;
    assert_eq!(store.record_counts().await, (1, 1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_upserts_create_one_record_document() {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("config.db").display());
    let store = Arc::new(
        DocumentConfigStore::connect(&url, RecordDefaults::default(), Duration::from_secs(5))
            .await
            .unwrap(),
    );

    race_upserts(store.clone()).await;
    assert_eq!(store.record_counts().await, (1, 1));
}
