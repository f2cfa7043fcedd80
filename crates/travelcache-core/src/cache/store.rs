use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::models::{Segment, Travel, TravelDetails};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("travel not found: {0}")]
    TravelNotFound(i64),

    #[error("persistence failed: {0}")]
    Persistence(String),
}

impl From<anyhow::Error> for StoreError {
    fn from(e: anyhow::Error) -> Self {
        StoreError::Persistence(format!("{:#}", e))
    }
}

/// The full set of rows a store holds: travels and segments, kept apart the
/// way the remote schema keeps them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordSet {
    pub travels: Vec<Travel>,
    pub segments: Vec<Segment>,
}

impl RecordSet {
    pub fn new(travels: Vec<Travel>, segments: Vec<Segment>) -> Self {
        Self { travels, segments }
    }

    /// Flatten fetched aggregates into rows.
    pub fn from_details(details: Vec<TravelDetails>) -> Self {
        let mut records = Self::default();
        for d in details {
            let (travel, segments) = d.into_parts();
            records.insert(travel, segments);
        }
        records
    }

    pub fn is_empty(&self) -> bool {
        self.travels.is_empty()
    }

    /// Rebuild aggregates by grouping segments on `travelID`. Travel order is
    /// preserved; segments pointing at no stored travel are skipped.
    pub fn details(&self) -> Vec<TravelDetails> {
        let mut by_travel: HashMap<Option<i64>, Vec<Segment>> = HashMap::new();
        for segment in &self.segments {
            by_travel.entry(segment.travel_id).or_default().push(segment.clone());
        }

        let details: Vec<TravelDetails> = self
            .travels
            .iter()
            .map(|travel| {
                let segments = by_travel.remove(&travel.travel_id).unwrap_or_default();
                TravelDetails::new(travel.clone(), segments)
            })
            .collect();

        if !by_travel.is_empty() {
            let orphans: usize = by_travel.values().map(Vec::len).sum();
            debug!(orphans, "Skipping segments without a stored travel");
        }

        details
    }

    pub fn find_travel(&self, travel_id: i64) -> Option<&Travel> {
        self.travels.iter().find(|t| t.travel_id == Some(travel_id))
    }

    pub fn find_travel_mut(&mut self, travel_id: i64) -> Option<&mut Travel> {
        self.travels.iter_mut().find(|t| t.travel_id == Some(travel_id))
    }

    pub fn insert(&mut self, travel: Travel, segments: Vec<Segment>) {
        self.travels.push(travel);
        self.segments.extend(segments);
    }

    /// Remove a travel and every segment that belongs to it. Returns whether
    /// the travel was present.
    pub fn remove_travel(&mut self, travel_id: i64) -> bool {
        let before = self.travels.len();
        self.travels.retain(|t| t.travel_id != Some(travel_id));
        self.segments.retain(|s| s.travel_id != Some(travel_id));
        self.travels.len() != before
    }

    pub fn clear(&mut self) {
        self.travels.clear();
        self.segments.clear();
    }
}

/// Durable local storage for travel rows.
///
/// `commit` must be all-or-nothing: after an error the store still returns
/// the previous snapshot.
pub trait LocalRecordStore: Send {
    fn snapshot(&self) -> Result<RecordSet, StoreError>;

    fn commit(&mut self, records: RecordSet) -> Result<(), StoreError>;

    /// When the current contents were committed, if known.
    fn cached_at(&self) -> Option<DateTime<Utc>> {
        None
    }

    /// Apply `f` to a staged copy and commit it only if `f` succeeds.
    fn transaction<F>(&mut self, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut RecordSet) -> Result<(), StoreError>,
        Self: Sized,
    {
        let mut staged = self.snapshot()?;
        f(&mut staged)?;
        self.commit(staged)
    }

    fn replace_all(&mut self, travels: Vec<Travel>, segments: Vec<Segment>) -> Result<(), StoreError> {
        self.commit(RecordSet::new(travels, segments))
    }
}

/// In-memory store. Commits are a plain swap.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: RecordSet,
    cached_at: Option<DateTime<Utc>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: RecordSet) -> Self {
        Self {
            records,
            cached_at: Some(Utc::now()),
        }
    }
}

impl LocalRecordStore for MemoryRecordStore {
    fn snapshot(&self) -> Result<RecordSet, StoreError> {
        Ok(self.records.clone())
    }

    fn commit(&mut self, records: RecordSet) -> Result<(), StoreError> {
        self.records = records;
        self.cached_at = Some(Utc::now());
        Ok(())
    }

    fn cached_at(&self) -> Option<DateTime<Utc>> {
        self.cached_at
    }
}
