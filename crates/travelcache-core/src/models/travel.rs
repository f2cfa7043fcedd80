use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::review::Review;
use super::segment::{Segment, Vehicle};
use crate::compensation::{trees_for_co2, PRICE_PER_TREE};
use crate::utils::format_hours_minutes;

/// A booked trip as stored by the remote authority.
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Travel {
    #[serde(rename = "travelID", default)]
    pub travel_id: Option<i64>,
    #[serde(rename = "userID")]
    pub user_id: i64,
    #[serde(rename = "CO2Compensated", default)]
    pub co2_compensated: f64,
    #[serde(default)]
    pub confirmed: bool,
    #[serde(rename = "userReview", default, skip_serializing_if = "Option::is_none")]
    pub user_review: Option<Review>,
}

impl Travel {
    pub fn new(travel_id: Option<i64>, user_id: i64) -> Self {
        Self {
            travel_id,
            user_id,
            co2_compensated: 0.0,
            confirmed: false,
            user_review: None,
        }
    }
}

// (is_outward, num_segment); outward sorts after return because false < true.
type SegmentKey = (bool, u32);

const FIRST_OUTWARD: SegmentKey = (true, 0);

/// A travel together with its segments, indexed by direction and order.
///
/// Never persisted as-is: the store keeps travels and segments as separate
/// rows and this aggregate is rebuilt on every read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TravelDetailsRecord", into = "TravelDetailsRecord")]
pub struct TravelDetails {
    travel: Travel,
    segments: BTreeMap<SegmentKey, Segment>,
}

#[derive(Serialize, Deserialize)]
struct TravelDetailsRecord {
    travel: Travel,
    #[serde(default)]
    segments: Vec<Segment>,
}

impl From<TravelDetailsRecord> for TravelDetails {
    fn from(record: TravelDetailsRecord) -> Self {
        TravelDetails::new(record.travel, record.segments)
    }
}

impl From<TravelDetails> for TravelDetailsRecord {
    fn from(details: TravelDetails) -> Self {
        let (travel, segments) = details.into_parts();
        TravelDetailsRecord { travel, segments }
    }
}

impl TravelDetails {
    pub fn new(travel: Travel, segments: Vec<Segment>) -> Self {
        let mut index = BTreeMap::new();
        for segment in segments {
            let key = (segment.is_outward, segment.num_segment);
            if let Some(previous) = index.insert(key, segment) {
                warn!(
                    travel_id = ?travel.travel_id,
                    is_outward = key.0,
                    num_segment = key.1,
                    dropped_segment_id = ?previous.segment_id,
                    "Duplicate segment position, keeping the later one"
                );
            }
        }
        Self {
            travel,
            segments: index,
        }
    }

    pub fn travel(&self) -> &Travel {
        &self.travel
    }

    pub fn travel_mut(&mut self) -> &mut Travel {
        &mut self.travel
    }

    pub fn travel_id(&self) -> Option<i64> {
        self.travel.travel_id
    }

    pub fn into_parts(self) -> (Travel, Vec<Segment>) {
        (self.travel, self.segments.into_values().collect())
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// All segments, return leg first, each leg in `numSegment` order.
    pub fn segments(&self) -> impl DoubleEndedIterator<Item = &Segment> {
        self.segments.values()
    }

    pub fn outward_segments(&self) -> impl DoubleEndedIterator<Item = &Segment> {
        self.segments.range(FIRST_OUTWARD..).map(|(_, s)| s)
    }

    pub fn return_segments(&self) -> impl DoubleEndedIterator<Item = &Segment> {
        self.segments.range(..FIRST_OUTWARD).map(|(_, s)| s)
    }

    fn direction(&self, outward: bool) -> Box<dyn DoubleEndedIterator<Item = &Segment> + '_> {
        if outward {
            Box::new(self.outward_segments())
        } else {
            Box::new(self.return_segments())
        }
    }

    // ===== Aggregates =====

    pub fn total_co2(&self) -> f64 {
        self.segments().map(|s| s.co2_emitted).sum()
    }

    pub fn total_co2_for(&self, outward: bool) -> f64 {
        self.direction(outward).map(|s| s.co2_emitted).sum()
    }

    pub fn total_price(&self) -> f64 {
        self.segments().map(|s| s.price).sum()
    }

    pub fn total_distance(&self) -> f64 {
        self.segments().map(|s| s.distance).sum()
    }

    pub fn total_duration(&self) -> Duration {
        Duration::nanoseconds(self.segments().map(|s| s.duration).sum())
    }

    /// Total duration as "{h} h, {m} m"; leftover seconds are dropped.
    pub fn total_duration_display(&self) -> String {
        format_hours_minutes(self.total_duration())
    }

    /// Price plus one tree for every started 75 kg of emitted CO2.
    pub fn green_price(&self) -> f64 {
        self.total_price() + PRICE_PER_TREE * f64::from(trees_for_co2(self.total_co2()))
    }

    pub fn is_oneway(&self) -> bool {
        self.return_segments().next().is_none()
    }

    // ===== Boundary segments =====

    pub fn departure_segment(&self) -> Option<&Segment> {
        self.outward_segments().next()
    }

    /// Final outward stop. For a round trip this is the turn-around point.
    pub fn destination_segment(&self) -> Option<&Segment> {
        self.outward_segments().next_back()
    }

    pub fn last_segment(&self) -> Option<&Segment> {
        self.return_segments()
            .next_back()
            .or_else(|| self.outward_segments().next_back())
    }

    pub fn arrival_time(&self) -> Option<DateTime<Utc>> {
        self.last_segment().map(Segment::arrival_time)
    }

    /// A travel without segments is never completed.
    pub fn is_completed(&self, now: DateTime<Utc>) -> bool {
        self.arrival_time().map(|arrival| arrival <= now).unwrap_or(false)
    }

    pub fn count_changes(&self, outward: bool) -> usize {
        self.direction(outward).count()
    }

    pub fn find_vehicle(&self, outward: bool) -> Option<Vehicle> {
        self.direction(outward).next().map(|s| s.vehicle)
    }
}
