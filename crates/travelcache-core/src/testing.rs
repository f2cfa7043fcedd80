//! Fixtures and in-memory collaborators shared by the unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Duration, TimeZone, Utc};
use futures::future::{self, BoxFuture};

use crate::cache::{LocalRecordStore, MemoryRecordStore, RecordSet, StoreError};
use crate::models::{CityReviewElement, Review, Segment, Travel, TravelDetails, Vehicle};
use crate::remote::{PageDirection, RemoteError, RemoteReviewService, RemoteTravelService, ReviewPageRequest};

pub const TEST_USER_ID: i64 = 42;

fn base_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

pub fn segment(travel_id: i64, num: u32, outward: bool) -> Segment {
    let offset = i64::from(num) + if outward { 0 } else { 24 };
    Segment {
        segment_id: Some(travel_id * 100 + i64::from(num) + if outward { 0 } else { 50 }),
        departure_id: 1,
        destination_id: 2,
        departure_city: "Milan".to_string(),
        departure_country: "Italy".to_string(),
        destination_city: "Paris".to_string(),
        destination_country: "France".to_string(),
        date_time: base_date() + Duration::hours(offset),
        duration: Duration::hours(1).num_nanoseconds().unwrap_or_default(),
        vehicle: Vehicle::Train,
        description: String::new(),
        price: 0.0,
        co2_emitted: 0.0,
        distance: 0.0,
        num_segment: num,
        is_outward: outward,
        travel_id: Some(travel_id),
    }
}

pub fn travel(id: i64) -> Travel {
    Travel::new(Some(id), TEST_USER_ID)
}

pub fn details(id: i64, segments: Vec<Segment>) -> TravelDetails {
    TravelDetails::new(travel(id), segments)
}

pub fn review(id: i64, user_id: i64) -> Review {
    Review {
        review_id: Some(id),
        city_id: 3,
        user_id,
        review_text: format!("Review {}", id),
        local_transport_rating: 3,
        green_spaces_rating: 3,
        waste_bins_rating: 3,
        date_time: base_date() + Duration::minutes(id),
        city_iata: "AMS".to_string(),
        country_code: "NL".to_string(),
        first_name: "Test".to_string(),
        last_name: format!("User{}", user_id),
    }
}

// ===== Travel service =====

#[derive(Default)]
struct TravelServiceState {
    travels: Vec<TravelDetails>,
    fetch_failures: VecDeque<RemoteError>,
    update_failure: Option<RemoteError>,
    delete_failure: Option<RemoteError>,
    fetch_calls: usize,
    update_calls: Vec<Travel>,
    delete_calls: Vec<i64>,
}

/// Server double holding the authoritative travel list.
#[derive(Default)]
pub struct MockTravelService {
    state: Mutex<TravelServiceState>,
}

impl MockTravelService {
    pub fn new(travels: Vec<TravelDetails>) -> Self {
        Self {
            state: Mutex::new(TravelServiceState {
                travels,
                ..Default::default()
            }),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, TravelServiceState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue errors returned by the next fetches, in order.
    pub fn fail_fetches(&self, errors: Vec<RemoteError>) {
        self.state().fetch_failures.extend(errors);
    }

    pub fn fail_updates(&self, error: RemoteError) {
        self.state().update_failure = Some(error);
    }

    pub fn fail_deletes(&self, error: RemoteError) {
        self.state().delete_failure = Some(error);
    }

    pub fn fetch_calls(&self) -> usize {
        self.state().fetch_calls
    }

    pub fn update_calls(&self) -> Vec<Travel> {
        self.state().update_calls.clone()
    }

    pub fn delete_calls(&self) -> Vec<i64> {
        self.state().delete_calls.clone()
    }
}

impl RemoteTravelService for MockTravelService {
    fn fetch_travels(&self, _user_id: i64) -> BoxFuture<'_, Result<Vec<TravelDetails>, RemoteError>> {
        let mut state = self.state();
        state.fetch_calls += 1;
        let result = match state.fetch_failures.pop_front() {
            Some(e) => Err(e),
            None => Ok(state.travels.clone()),
        };
        Box::pin(future::ready(result))
    }

    fn update_travel(&self, travel: Travel) -> BoxFuture<'_, Result<Travel, RemoteError>> {
        let mut state = self.state();
        state.update_calls.push(travel.clone());
        let result = match state.update_failure.clone() {
            Some(e) => Err(e),
            None => {
                if let Some(existing) = state
                    .travels
                    .iter_mut()
                    .find(|d| d.travel_id().is_some() && d.travel_id() == travel.travel_id)
                {
                    *existing.travel_mut() = travel.clone();
                }
                Ok(travel)
            }
        };
        Box::pin(future::ready(result))
    }

    fn delete_travel(&self, travel_id: i64) -> BoxFuture<'_, Result<(), RemoteError>> {
        let mut state = self.state();
        state.delete_calls.push(travel_id);
        let result = match state.delete_failure.clone() {
            Some(e) => Err(e),
            None => {
                state.travels.retain(|d| d.travel_id() != Some(travel_id));
                Ok(())
            }
        };
        Box::pin(future::ready(result))
    }
}

// ===== Record store =====

/// Memory store whose first `fail_commits` commits fail.
pub struct FlakyStore {
    inner: MemoryRecordStore,
    fail_commits: usize,
}

impl FlakyStore {
    pub fn new(inner: MemoryRecordStore, fail_commits: usize) -> Self {
        Self { inner, fail_commits }
    }
}

impl LocalRecordStore for FlakyStore {
    fn snapshot(&self) -> Result<RecordSet, StoreError> {
        self.inner.snapshot()
    }

    fn commit(&mut self, records: RecordSet) -> Result<(), StoreError> {
        if self.fail_commits > 0 {
            self.fail_commits -= 1;
            return Err(StoreError::Persistence("injected commit failure".to_string()));
        }
        self.inner.commit(records)
    }

    fn cached_at(&self) -> Option<DateTime<Utc>> {
        self.inner.cached_at()
    }
}

// ===== Review service =====

struct ReviewServiceState {
    /// Newest first.
    reviews: Vec<Review>,
    page_size: usize,
    fetch_failures: usize,
    fetch_error: Option<RemoteError>,
    mutation_failure: Option<RemoteError>,
    requests: Vec<ReviewPageRequest>,
    uploads: usize,
}

/// Server double paging one city's reviews the way the backend does.
pub struct MockReviewService {
    state: Mutex<ReviewServiceState>,
}

impl MockReviewService {
    pub fn new(mut reviews: Vec<Review>, page_size: usize) -> Self {
        reviews.sort_by(|a, b| b.review_id.cmp(&a.review_id));
        Self {
            state: Mutex::new(ReviewServiceState {
                reviews,
                page_size,
                fetch_failures: 0,
                fetch_error: None,
                mutation_failure: None,
                requests: Vec::new(),
                uploads: 0,
            }),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, ReviewServiceState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make the server return more reviews per page than the client asks for.
    pub fn set_server_page_size(&mut self, page_size: usize) {
        self.state().page_size = page_size;
    }

    /// Fail the next `count` page fetches with `error`.
    pub fn fail_fetches(&self, count: usize, error: RemoteError) {
        let mut state = self.state();
        state.fetch_failures = count;
        state.fetch_error = Some(error);
    }

    pub fn fail_mutations(&self, error: RemoteError) {
        self.state().mutation_failure = Some(error);
    }

    pub fn last_request(&self) -> Option<ReviewPageRequest> {
        self.state().requests.last().cloned()
    }

    pub fn upload_count(&self) -> usize {
        self.state().uploads
    }

    fn page(state: &ReviewServiceState, request: &ReviewPageRequest) -> CityReviewElement {
        let all = &state.reviews;
        let size = state.page_size;
        let id = |r: &Review| r.review_id.unwrap_or_default();
        let cursor = request.cursor_review_id.unwrap_or_default();

        let (reviews, has_previous, has_next): (Vec<Review>, bool, bool) = match request.direction {
            PageDirection::First => {
                let page: Vec<_> = all.iter().take(size).cloned().collect();
                let more = all.len() > page.len();
                (page, false, more)
            }
            PageDirection::Last => {
                let skip = all.len().saturating_sub(size);
                let page: Vec<_> = all.iter().skip(skip).cloned().collect();
                (page, skip > 0, false)
            }
            PageDirection::Older => {
                let older: Vec<_> = all.iter().filter(|r| id(r) < cursor).cloned().collect();
                let page: Vec<_> = older.iter().take(size).cloned().collect();
                let has_previous = all.iter().any(|r| id(r) >= cursor);
                (page.clone(), has_previous, older.len() > page.len())
            }
            PageDirection::Newer => {
                let mut newer: Vec<_> = all.iter().filter(|r| id(r) > cursor).cloned().collect();
                newer.reverse();
                let mut page: Vec<_> = newer.iter().take(size).cloned().collect();
                let has_previous = newer.len() > page.len();
                page.reverse();
                let has_next = all.iter().any(|r| id(r) <= cursor);
                (page, has_previous, has_next)
            }
        };

        let mean = |f: fn(&Review) -> i32| {
            if all.is_empty() {
                0.0
            } else {
                all.iter().map(|r| f64::from(f(r))).sum::<f64>() / all.len() as f64
            }
        };

        CityReviewElement {
            reviews,
            average_local_transport_rating: mean(|r| r.local_transport_rating),
            average_green_spaces_rating: mean(|r| r.green_spaces_rating),
            average_waste_bins_rating: mean(|r| r.waste_bins_rating),
            has_previous,
            has_next,
            num_reviews: all.len() as i64,
        }
    }

    fn check_mutation(state: &ReviewServiceState) -> Result<(), RemoteError> {
        match &state.mutation_failure {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

impl RemoteReviewService for MockReviewService {
    fn fetch_review_page(
        &self,
        request: ReviewPageRequest,
    ) -> BoxFuture<'_, Result<CityReviewElement, RemoteError>> {
        let mut state = self.state();
        state.requests.push(request.clone());
        let result = if state.fetch_failures > 0 {
            state.fetch_failures -= 1;
            Err(state
                .fetch_error
                .clone()
                .unwrap_or_else(|| RemoteError::NetworkError("injected".to_string())))
        } else {
            Ok(Self::page(&state, &request))
        };
        Box::pin(future::ready(result))
    }

    fn upload_review(&self, mut review: Review) -> BoxFuture<'_, Result<Review, RemoteError>> {
        let mut state = self.state();
        state.uploads += 1;
        let result = Self::check_mutation(&state).map(|_| {
            let next_id = state.reviews.iter().filter_map(|r| r.review_id).max().unwrap_or(0) + 1;
            review.review_id = Some(next_id);
            state.reviews.insert(0, review.clone());
            review
        });
        Box::pin(future::ready(result))
    }

    fn modify_review(&self, review: Review) -> BoxFuture<'_, Result<Review, RemoteError>> {
        let mut state = self.state();
        let result = Self::check_mutation(&state).and_then(|_| {
            let existing = state
                .reviews
                .iter_mut()
                .find(|r| r.review_id == review.review_id)
                .ok_or_else(|| RemoteError::NotFound("review".to_string()))?;
            *existing = review.clone();
            Ok(review)
        });
        Box::pin(future::ready(result))
    }

    fn delete_review(&self, review_id: i64) -> BoxFuture<'_, Result<(), RemoteError>> {
        let mut state = self.state();
        let result = Self::check_mutation(&state).map(|_| {
            state.reviews.retain(|r| r.review_id != Some(review_id));
        });
        Box::pin(future::ready(result))
    }

    fn fetch_best_reviewed_cities(&self) -> BoxFuture<'_, Result<Vec<CityReviewElement>, RemoteError>> {
        let state = self.state();
        let request = ReviewPageRequest {
            iata: "AMS".to_string(),
            country_code: "NL".to_string(),
            cursor_review_id: None,
            direction: PageDirection::First,
        };
        let result = Ok(vec![Self::page(&state, &request)]);
        Box::pin(future::ready(result))
    }
}
