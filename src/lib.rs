// Persistence layer for the bot's configuration state.
//
// **Architecture Overview:**
// - `core/` = Record schemas, the storage contract and the config service
// - `infra/` = Implementations of the contract (JSON file, document database)
//   plus the startup backend selector

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
pub mod core;
#[path = "infra/infra_layer.rs"]
pub mod infra;
