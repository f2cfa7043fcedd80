//! Remote collaborator interfaces.
//!
//! The core never talks to the network itself. Hosts implement
//! `RemoteTravelService` and `RemoteReviewService` on top of their transport
//! and classify failures into `RemoteError`.
//!
//! Idempotent fetches go through `with_retry`; mutating calls never do.

pub mod error;

use std::future::Future;
use std::time::Duration;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::{CityReviewElement, Review, Travel, TravelDetails};

pub use error::RemoteError;

/// Number of transparent retries for idempotent fetches.
const DEFAULT_FETCH_RETRIES: u32 = 2;

/// Initial backoff between fetch retries.
const DEFAULT_BACKOFF_MS: u64 = 500;

pub trait RemoteTravelService: Send + Sync {
    fn fetch_travels(&self, user_id: i64) -> BoxFuture<'_, Result<Vec<TravelDetails>, RemoteError>>;

    /// Full-record update; the returned travel is authoritative.
    fn update_travel(&self, travel: Travel) -> BoxFuture<'_, Result<Travel, RemoteError>>;

    fn delete_travel(&self, travel_id: i64) -> BoxFuture<'_, Result<(), RemoteError>>;
}

/// Which window of a city's reviews to fetch, relative to the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageDirection {
    /// Freshest reviews; the cursor is ignored.
    First,
    /// Reviews strictly older than the cursor.
    Older,
    /// Reviews strictly newer than the cursor.
    Newer,
    /// Oldest reviews; the cursor is ignored.
    Last,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewPageRequest {
    pub iata: String,
    pub country_code: String,
    pub cursor_review_id: Option<i64>,
    pub direction: PageDirection,
}

pub trait RemoteReviewService: Send + Sync {
    fn fetch_review_page(
        &self,
        request: ReviewPageRequest,
    ) -> BoxFuture<'_, Result<CityReviewElement, RemoteError>>;

    fn upload_review(&self, review: Review) -> BoxFuture<'_, Result<Review, RemoteError>>;

    fn modify_review(&self, review: Review) -> BoxFuture<'_, Result<Review, RemoteError>>;

    fn delete_review(&self, review_id: i64) -> BoxFuture<'_, Result<(), RemoteError>>;

    fn fetch_best_reviewed_cities(&self) -> BoxFuture<'_, Result<Vec<CityReviewElement>, RemoteError>>;
}

/// Retry budget for idempotent fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_FETCH_RETRIES,
            initial_backoff: Duration::from_millis(DEFAULT_BACKOFF_MS),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_backoff: Duration) -> Self {
        Self {
            max_retries,
            initial_backoff,
        }
    }

    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }
}

/// Run an idempotent fetch, retrying transient failures with exponential
/// backoff until the policy's budget is spent.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T, RemoteError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RemoteError>>,
{
    let mut retries = 0;
    let mut backoff = policy.initial_backoff;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && retries < policy.max_retries => {
                retries += 1;
                warn!(
                    request = what,
                    retry = retries,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %e,
                    "Fetch failed, retrying"
                );
                if !backoff.is_zero() {
                    tokio::time::sleep(backoff).await;
                }
                backoff *= 2;
            }
            Err(e) => return Err(e),
        }
    }
}
