//! Travel cache synchronization.
//!
//! `TravelSynchronizer` is the only write path for travel data. It keeps the
//! local store equal to the remote service's view using full-replace syncs,
//! and applies the results of remote mutations to the cached rows.
//!
//! Every mutating operation holds the store lock for its whole duration,
//! remote round trip included, so refresh/update/delete never interleave.

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::cache::{LocalRecordStore, RecordSet, StoreError};
use crate::error::CoreError;
use crate::models::{Travel, TravelDetails};
use crate::remote::{with_retry, RemoteTravelService, RetryPolicy};

pub struct TravelSynchronizer<R, S> {
    remote: R,
    store: Mutex<S>,
    user_id: i64,
    retry: RetryPolicy,
}

impl<R, S> TravelSynchronizer<R, S>
where
    R: RemoteTravelService,
    S: LocalRecordStore,
{
    pub fn new(remote: R, store: S, user_id: i64) -> Self {
        Self {
            remote,
            store: Mutex::new(store),
            user_id,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    // ===== Reads =====

    /// Consistent copy of the cached travels, grouped with their segments.
    pub async fn travels(&self) -> Result<Vec<TravelDetails>, CoreError> {
        let store = self.store.lock().await;
        Ok(store.snapshot()?.details())
    }

    pub async fn find_travel(&self, travel_id: i64) -> Result<Option<TravelDetails>, CoreError> {
        Ok(self
            .travels()
            .await?
            .into_iter()
            .find(|d| d.travel_id() == Some(travel_id)))
    }

    /// True when the store has never been committed or is older than
    /// `stale_minutes`.
    pub async fn is_stale(&self, stale_minutes: i64) -> bool {
        let store = self.store.lock().await;
        match store.cached_at() {
            Some(cached_at) => (Utc::now() - cached_at).num_minutes() > stale_minutes,
            None => true,
        }
    }

    /// Refresh only when the cache is stale. Returns whether a refresh ran.
    pub async fn refresh_if_stale(&self, stale_minutes: i64) -> Result<bool, CoreError> {
        if !self.is_stale(stale_minutes).await {
            debug!("Travel cache is fresh, skipping refresh");
            return Ok(false);
        }
        self.refresh().await?;
        Ok(true)
    }

    // ===== Writes =====

    /// Pull every travel from the remote service and replace the local
    /// contents with them in a single commit.
    pub async fn refresh(&self) -> Result<Vec<TravelDetails>, CoreError> {
        let mut store = self.store.lock().await;
        self.refresh_locked(&mut *store).await
    }

    async fn refresh_locked(&self, store: &mut S) -> Result<Vec<TravelDetails>, CoreError> {
        info!(user_id = self.user_id, "Refreshing travel cache");

        let fetched = with_retry(&self.retry, "fetch_travels", || {
            self.remote.fetch_travels(self.user_id)
        })
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to fetch travels, keeping local cache");
            CoreError::TransientRemote(e)
        })?;

        let records = RecordSet::from_details(fetched);
        let details = records.details();
        let (travels, segments) = (records.travels, records.segments);

        store.replace_all(travels, segments).map_err(|e| {
            warn!(error = %e, "Failed to save fetched travels");
            CoreError::LocalStore(e)
        })?;

        info!(count = details.len(), "Travel cache refreshed");
        Ok(details)
    }

    /// Send a full-record update and apply the server's answer locally.
    /// Never retried.
    pub async fn push_travel(&self, travel: Travel) -> Result<Travel, CoreError> {
        let mut store = self.store.lock().await;

        let updated = self.remote.update_travel(travel).await.map_err(|e| {
            warn!(error = %e, "Travel update rejected");
            CoreError::MutationRemote(e)
        })?;

        if let Err(e) = self.apply_locked(&mut *store, &updated).await {
            error!(
                travel_id = ?updated.travel_id,
                error = %e,
                "Update applied remotely but local cache is stale"
            );
            return Err(CoreError::AppliedRemotely {
                travel: Box::new(updated),
                source: Box::new(e),
            });
        }
        Ok(updated)
    }

    /// Copy the compensation and confirmation state of a travel the server
    /// returned into the cached row. Falls back to a full refresh when the
    /// row is missing or the store fails.
    pub async fn apply_server_travel(&self, updated: Travel) -> Result<(), CoreError> {
        let mut store = self.store.lock().await;
        self.apply_locked(&mut *store, &updated).await
    }

    async fn apply_locked(&self, store: &mut S, updated: &Travel) -> Result<(), CoreError> {
        let Some(travel_id) = updated.travel_id else {
            return Err(CoreError::InvalidRequest(
                "server returned a travel without an id".to_string(),
            ));
        };

        let result = store.transaction(|records| {
            let travel = records
                .find_travel_mut(travel_id)
                .ok_or(StoreError::TravelNotFound(travel_id))?;
            travel.co2_compensated = updated.co2_compensated;
            travel.confirmed = updated.confirmed;
            Ok(())
        });

        match result {
            Ok(()) => {
                debug!(travel_id, co2_compensated = updated.co2_compensated, confirmed = updated.confirmed, "Applied server travel");
                Ok(())
            }
            Err(StoreError::TravelNotFound(_)) => {
                info!(travel_id, "Updated travel not cached, running full refresh");
                self.refresh_locked(store).await.map(|_| ())
            }
            Err(e) => {
                warn!(travel_id, error = %e, "Local update failed, running full refresh");
                self.refresh_locked(store).await.map(|_| ())
            }
        }
    }

    /// Delete a travel remotely, then drop it and its segments locally.
    /// A failed remote delete leaves the cache untouched and is not retried.
    pub async fn delete_travel(&self, travel_id: i64) -> Result<(), CoreError> {
        let mut store = self.store.lock().await;

        self.remote.delete_travel(travel_id).await.map_err(|e| {
            warn!(travel_id, error = %e, "Remote delete failed");
            CoreError::MutationRemote(e)
        })?;

        let result = store.transaction(|records| {
            if !records.remove_travel(travel_id) {
                debug!(travel_id, "Deleted travel was not cached");
            }
            Ok(())
        });

        if let Err(e) = result {
            warn!(travel_id, error = %e, "Local delete failed, running full refresh");
            self.refresh_locked(&mut *store).await?;
        }

        info!(travel_id, "Travel deleted");
        Ok(())
    }
}
