use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Means of transport for a single segment.
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vehicle {
    Walk,
    Bike,
    Car,
    Bus,
    Train,
    Plane,
}

impl Vehicle {
    /// Icon token used by the presentation layer.
    pub fn icon(&self) -> &'static str {
        match self {
            Vehicle::Walk => "walking",
            Vehicle::Bike => "bicycle",
            Vehicle::Car => "car",
            Vehicle::Bus => "bus",
            Vehicle::Train => "tram",
            Vehicle::Plane => "airplane",
        }
    }
}

impl std::fmt::Display for Vehicle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Vehicle::Walk => write!(f, "Walk"),
            Vehicle::Bike => write!(f, "Bike"),
            Vehicle::Car => write!(f, "Car"),
            Vehicle::Bus => write!(f, "Bus"),
            Vehicle::Train => write!(f, "Train"),
            Vehicle::Plane => write!(f, "Plane"),
        }
    }
}

/// One directional leg of a trip.
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    #[serde(rename = "segmentID", default)]
    pub segment_id: Option<i64>,
    #[serde(rename = "departureID")]
    pub departure_id: i64,
    #[serde(rename = "destinationID")]
    pub destination_id: i64,
    #[serde(rename = "departureCity", default)]
    pub departure_city: String,
    #[serde(rename = "departureCountry", default)]
    pub departure_country: String,
    #[serde(rename = "destinationCity", default)]
    pub destination_city: String,
    #[serde(rename = "destinationCountry", default)]
    pub destination_country: String,
    #[serde(rename = "dateTime")]
    pub date_time: DateTime<Utc>,
    /// Duration in nanoseconds.
    pub duration: i64,
    pub vehicle: Vehicle,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: f64,
    #[serde(rename = "co2Emitted", default)]
    pub co2_emitted: f64,
    #[serde(default)]
    pub distance: f64,
    #[serde(rename = "numSegment")]
    pub num_segment: u32,
    #[serde(rename = "isOutward")]
    pub is_outward: bool,
    #[serde(rename = "travelID", default)]
    pub travel_id: Option<i64>,
}

impl Segment {
    pub fn duration(&self) -> Duration {
        Duration::nanoseconds(self.duration)
    }

    pub fn arrival_time(&self) -> DateTime<Utc> {
        self.date_time + self.duration()
    }

    /// "Milan, Italy -> Paris, France"
    pub fn route_display(&self) -> String {
        format!(
            "{}, {} -> {}, {}",
            self.departure_city, self.departure_country, self.destination_city, self.destination_country
        )
    }
}
