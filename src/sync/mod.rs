//! Delta sync between devices and the server.
//!
//! Devices push field diffs and deletions, then pull everything that changed after
//! their cursor as an [`UpdatedItems`] envelope plus tombstones.
//!
//! # Usage
//!
//! ```
//! use planner_sync::models::{Item, Year};
//! use planner_sync::sync::{
//!     ChangeFeed, ItemUpdate, LoginCredentials, MemoryStore, SyncRequest, SyncState,
//! };
//! use planner_sync::SyncConfig;
//!
//! let mut feed = ChangeFeed::new(SyncConfig::default(), MemoryStore::new());
//! let year = Item::from(Year::new("Freshman"));
//!
//! let mut state = SyncState::new();
//! let request = SyncRequest::new(LoginCredentials::new("ada", "token"), 1)
//!     .with_updates(vec![ItemUpdate::from_item(&year).unwrap()]);
//! let response = feed.sync(state.prepare(request)).unwrap();
//! state.accept(&response).unwrap();
//!
//! assert_eq!(response.updated_items.years().len(), 1);
//! assert_eq!(state.change_cursor, 1);
//! ```

pub mod cursor;
pub mod envelope;
pub mod error;
pub mod feed;
pub mod legacy;
pub mod offset;
pub mod protocol;
pub mod settings;

pub use cursor::{Progress, SyncState};
pub use envelope::UpdatedItems;
pub use error::{
    AccountError, EnvelopeError, StoreError, SyncError, UpdateError, UpdateErrorKind,
};
pub use feed::{ChangeFeed, ItemStore, MemoryStore, StoredItem, StoredTombstone};
pub use legacy::{downgrade_envelope, downgrade_item};
pub use protocol::{
    DeletedItem, ItemUpdate, LoginCredentials, SyncRequest, SyncResponse, SyncSettingsRequest,
    SyncSettingsResponse, MAX_ITEMS_TO_RETURN,
};
pub use settings::{GpaOptions, Settings, SyncedSettings};
