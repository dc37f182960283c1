//! Planner Sync
//!
//! Shared data model of the academic planner and the delta sync contract between
//! devices and the server.

pub mod config;
pub mod logging;
pub mod models;
pub mod sync;

pub use config::{ConfigError, SyncConfig};
pub use models::{Entity, Item, ItemRef, ItemType, ModelError};
pub use sync::{
    ChangeFeed, ItemStore, MemoryStore, SyncError, SyncRequest, SyncResponse, SyncState,
    UpdatedItems,
};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
