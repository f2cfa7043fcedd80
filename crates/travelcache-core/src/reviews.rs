//! Cursor-based paging over a city's reviews.
//!
//! A `ReviewPager` is one city session. Pages are disjoint windows ordered
//! newest first; moving older or newer re-fetches the window using the id of
//! the boundary review as cursor. The first page doubles as the source of
//! the city's aggregate ratings and of the signed-in user's own review.

use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::models::{CityReviewElement, Review};
use crate::remote::{with_retry, PageDirection, RemoteReviewService, ReviewPageRequest, RetryPolicy};

/// Default number of reviews per page.
pub const DEFAULT_PAGE_SIZE: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityKey {
    pub iata: String,
    pub country_code: String,
}

/// The reviews currently shown and whether there is more on either side.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewWindow {
    pub reviews: Vec<Review>,
    pub has_previous: bool,
    pub has_next: bool,
}

pub struct ReviewPager<R> {
    remote: R,
    user_id: i64,
    page_size: usize,
    retry: RetryPolicy,
    city: Option<CityKey>,
    window: ReviewWindow,
    first_page: Option<CityReviewElement>,
    own_review: Option<Review>,
}

impl<R: RemoteReviewService> ReviewPager<R> {
    pub fn new(remote: R, user_id: i64) -> Self {
        Self {
            remote,
            user_id,
            page_size: DEFAULT_PAGE_SIZE,
            retry: RetryPolicy::default(),
            city: None,
            window: ReviewWindow::default(),
            first_page: None,
            own_review: None,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn city(&self) -> Option<&CityKey> {
        self.city.as_ref()
    }

    pub fn window(&self) -> &ReviewWindow {
        &self.window
    }

    pub fn own_review(&self) -> Option<&Review> {
        self.own_review.as_ref()
    }

    /// City-wide aggregates from the last first-page fetch.
    pub fn summary(&self) -> Option<&CityReviewElement> {
        self.first_page.as_ref()
    }

    /// Mean of the city's three per-category averages.
    pub fn average_rating(&self) -> Option<f64> {
        self.first_page.as_ref().map(CityReviewElement::average_rating)
    }

    pub fn num_reviews(&self) -> i64 {
        self.first_page.as_ref().map(|p| p.num_reviews).unwrap_or(0)
    }

    // ===== Navigation =====

    /// Start a session for a city and load its freshest reviews.
    pub async fn open_city(&mut self, iata: &str, country_code: &str) -> Result<&ReviewWindow, CoreError> {
        let city = CityKey {
            iata: iata.to_string(),
            country_code: country_code.to_string(),
        };
        if self.city.as_ref() != Some(&city) {
            self.window = ReviewWindow::default();
            self.first_page = None;
            self.own_review = None;
        }
        self.city = Some(city);
        self.first().await
    }

    /// Load the freshest page, refreshing aggregates and the own review.
    pub async fn first(&mut self) -> Result<&ReviewWindow, CoreError> {
        self.load_first().await?;
        Ok(&self.window)
    }

    async fn load_first(&mut self) -> Result<(), CoreError> {
        let page = self.fetch(PageDirection::First, None).await?;

        self.own_review = page.reviews.iter().find(|r| r.user_id == self.user_id).cloned();
        self.replace_window(&page);
        self.first_page = Some(page);
        Ok(())
    }

    /// Move to older reviews. Returns false without fetching when already on
    /// the last page.
    pub async fn next(&mut self) -> Result<bool, CoreError> {
        if !self.window.has_next {
            debug!("No older reviews");
            return Ok(false);
        }
        let cursor = Self::cursor_of(self.window.reviews.last())?;
        let page = self.fetch(PageDirection::Older, Some(cursor)).await?;
        self.replace_window(&page);
        Ok(true)
    }

    /// Move to newer reviews. Returns false without fetching when already on
    /// the first page.
    pub async fn previous(&mut self) -> Result<bool, CoreError> {
        if !self.window.has_previous {
            debug!("No newer reviews");
            return Ok(false);
        }
        let cursor = Self::cursor_of(self.window.reviews.first())?;
        let page = self.fetch(PageDirection::Newer, Some(cursor)).await?;
        self.replace_window(&page);
        Ok(true)
    }

    /// Jump to the oldest page.
    pub async fn last(&mut self) -> Result<&ReviewWindow, CoreError> {
        let page = self.fetch(PageDirection::Last, None).await?;
        self.replace_window(&page);
        Ok(&self.window)
    }

    fn cursor_of(review: Option<&Review>) -> Result<i64, CoreError> {
        review
            .and_then(|r| r.review_id)
            .ok_or_else(|| CoreError::InvalidRequest("no boundary review to page from".to_string()))
    }

    fn replace_window(&mut self, page: &CityReviewElement) {
        self.window = ReviewWindow {
            reviews: page.reviews.clone(),
            has_previous: page.has_previous,
            has_next: page.has_next,
        };
    }

    async fn fetch(&self, direction: PageDirection, cursor: Option<i64>) -> Result<CityReviewElement, CoreError> {
        let city = self
            .city
            .as_ref()
            .ok_or_else(|| CoreError::InvalidRequest("no city selected".to_string()))?;

        let request = ReviewPageRequest {
            iata: city.iata.clone(),
            country_code: city.country_code.clone(),
            cursor_review_id: cursor,
            direction,
        };
        debug!(iata = %city.iata, ?direction, ?cursor, "Fetching review page");

        let page = with_retry(&self.retry, "fetch_review_page", || {
            self.remote.fetch_review_page(request.clone())
        })
        .await
        .map_err(|e| {
            warn!(iata = %city.iata, error = %e, "Failed to fetch review page");
            CoreError::TransientRemote(e)
        })?;

        Ok(self.normalize(direction, page))
    }

    /// Enforce newest-first order, unique ids and the page size. An oversized
    /// page keeps the reviews next to its cursor: the oldest ones when paging
    /// newer or jumping to the last page, the newest ones otherwise.
    fn normalize(&self, direction: PageDirection, mut page: CityReviewElement) -> CityReviewElement {
        page.reviews.sort_by(|a, b| b.review_id.cmp(&a.review_id));
        page.reviews.dedup_by(|a, b| a.review_id.is_some() && a.review_id == b.review_id);

        let len = page.reviews.len();
        if len > self.page_size {
            warn!(
                received = len,
                page_size = self.page_size,
                ?direction,
                "Review page larger than page size, truncating"
            );
            match direction {
                PageDirection::Newer | PageDirection::Last => {
                    page.reviews.drain(..len - self.page_size);
                }
                PageDirection::First | PageDirection::Older => page.reviews.truncate(self.page_size),
            }
        }
        page
    }

    // ===== Own review =====

    fn validate(&self, review: &Review) -> Result<(), CoreError> {
        if self.city.is_none() {
            return Err(CoreError::InvalidRequest("no city selected".to_string()));
        }
        if let Some((category, value)) = review.invalid_rating() {
            return Err(CoreError::InvalidRequest(format!(
                "{} rating {} is outside 0..=5",
                category, value
            )));
        }
        Ok(())
    }

    /// Reload the first page after a write. A failed reload does not undo
    /// the write, so the server's copy is kept as the own review instead.
    async fn reload_after_write(&mut self, written: Option<Review>) {
        if let Err(e) = self.load_first().await {
            warn!(error = %e, "Reload after review write failed");
            self.own_review = written;
        }
    }

    pub async fn upload_review(&mut self, review: Review) -> Result<Review, CoreError> {
        self.validate(&review)?;

        let uploaded = self.remote.upload_review(review).await.map_err(|e| {
            warn!(error = %e, "Review upload failed");
            CoreError::MutationRemote(e)
        })?;

        info!(review_id = ?uploaded.review_id, "Review uploaded");
        self.reload_after_write(Some(uploaded.clone())).await;
        Ok(uploaded)
    }

    pub async fn modify_review(&mut self, review: Review) -> Result<Review, CoreError> {
        self.validate(&review)?;
        if review.review_id.is_none() {
            return Err(CoreError::InvalidRequest("review has no id yet".to_string()));
        }

        let modified = self.remote.modify_review(review).await.map_err(|e| {
            warn!(error = %e, "Review update failed");
            CoreError::MutationRemote(e)
        })?;

        info!(review_id = ?modified.review_id, "Review modified");
        self.reload_after_write(Some(modified.clone())).await;
        Ok(modified)
    }

    /// Delete the user's own review. The own-review reference is cleared only
    /// once the server confirms.
    pub async fn delete_own_review(&mut self) -> Result<(), CoreError> {
        let review_id = self
            .own_review
            .as_ref()
            .and_then(|r| r.review_id)
            .ok_or_else(|| CoreError::InvalidRequest("no own review to delete".to_string()))?;

        self.remote.delete_review(review_id).await.map_err(|e| {
            warn!(review_id, error = %e, "Review delete failed");
            CoreError::MutationRemote(e)
        })?;

        info!(review_id, "Review deleted");
        self.own_review = None;
        self.reload_after_write(None).await;
        Ok(())
    }

    pub async fn best_reviewed_cities(&self) -> Result<Vec<CityReviewElement>, CoreError> {
        fetch_best_reviewed_cities(&self.remote, &self.retry).await
    }
}

/// Cities with the highest ratings, as ranked by the server.
pub async fn fetch_best_reviewed_cities<R: RemoteReviewService>(
    remote: &R,
    retry: &RetryPolicy,
) -> Result<Vec<CityReviewElement>, CoreError> {
    with_retry(retry, "fetch_best_reviewed_cities", || remote.fetch_best_reviewed_cities())
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to fetch best reviewed cities");
            CoreError::TransientRemote(e)
        })
}
