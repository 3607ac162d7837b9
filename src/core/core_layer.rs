// The core module holds the record schemas, the storage contract
// and the service built on top of it. Nothing here knows about files
// or databases.

#[path = "storage/mod.rs"]
pub mod storage;
