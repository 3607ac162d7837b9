// The infra module contains implementations of core traits.

#[path = "storage/mod.rs"]
pub mod storage;
