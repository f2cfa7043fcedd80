//! Client-side travel cache and derived-state engine.
//!
//! The core keeps an offline copy of a user's travels in step with a remote
//! travel service and derives everything the presentation layer shows from
//! it:
//! - `sync`: refresh, update and delete through the remote service, writing
//!   the local store transactionally
//! - `views`: completed/upcoming filtering and the four sort orders
//! - `compensation`: tree planting accounting against a travel's CO2
//! - `reviews`: cursor-based paging over a city's reviews and the user's own
//!   review
//!
//! Network transport and rendering belong to the host, which plugs in
//! through the traits in `remote` and `cache`.

pub mod cache;
pub mod compensation;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod remote;
pub mod reviews;
pub mod sync;
pub mod utils;
pub mod views;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{JsonRecordStore, LocalRecordStore, MemoryRecordStore, RecordSet, StoreError};
pub use compensation::{CompensationDraft, CompensationError, CompensationLedger};
pub use config::Config;
pub use error::{CoreError, ErrorKind, USER_FACING_MESSAGE};
pub use models::{CityReviewElement, Review, Segment, Travel, TravelDetails, Vehicle};
pub use remote::{RemoteError, RemoteReviewService, RemoteTravelService, RetryPolicy};
pub use reviews::{fetch_best_reviewed_cities, ReviewPager, ReviewWindow};
pub use sync::TravelSynchronizer;
pub use views::{SortOption, TravelListView, TravelStats};
