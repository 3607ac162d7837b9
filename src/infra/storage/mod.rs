// Implementations of the ConfigStore contract.

pub mod backend_selector;
pub mod document_store;
pub mod json_store;

// Re-export for convenience
pub use backend_selector::select_backend;
pub use document_store::DocumentConfigStore;
pub use json_store::JsonConfigStore;

#[cfg(test)]
mod contract_tests;
