//! Local record storage for offline travel data.
//!
//! `LocalRecordStore` is the transactional contract the synchronizer writes
//! through. Two implementations ship with the core:
//! - `MemoryRecordStore` for hosts that persist elsewhere (and for tests)
//! - `JsonRecordStore`, a JSON file under the cache directory that records
//!   when it was last committed and is considered stale after 60 minutes

pub mod manager;
pub mod store;

pub use manager::{age_display, CachedData, JsonRecordStore, DEFAULT_STALE_MINUTES};
pub use store::{LocalRecordStore, MemoryRecordStore, RecordSet, StoreError};
