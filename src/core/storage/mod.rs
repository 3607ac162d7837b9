pub mod storage_config;
pub mod storage_models;
pub mod storage_service;
pub mod storage_store;

pub use storage_config::{StorageConfig, StorageKind};
pub use storage_models::{
    CoreArrayField, CoreRecord, GuildArrayField, GuildRecord, RecordDefaults, CORE_ID,
};
pub use storage_service::ConfigService;
pub use storage_store::{ConfigStore, StoreError};
