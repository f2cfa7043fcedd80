use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Highest value a sub-rating may take.
pub const MAX_RATING: i32 = 5;

#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    #[serde(rename = "reviewID", default)]
    pub review_id: Option<i64>,
    #[serde(rename = "cityID")]
    pub city_id: i64,
    #[serde(rename = "userID")]
    pub user_id: i64,
    #[serde(rename = "reviewText", default)]
    pub review_text: String,
    #[serde(rename = "localTransportRating")]
    pub local_transport_rating: i32,
    #[serde(rename = "greenSpacesRating")]
    pub green_spaces_rating: i32,
    #[serde(rename = "wasteBinsRating")]
    pub waste_bins_rating: i32,
    #[serde(rename = "dateTime")]
    pub date_time: DateTime<Utc>,
    #[serde(rename = "cityIata", default)]
    pub city_iata: String,
    #[serde(rename = "countryCode", default)]
    pub country_code: String,
    #[serde(rename = "firstName", default)]
    pub first_name: String,
    #[serde(rename = "lastName", default)]
    pub last_name: String,
}

impl Review {
    /// Mean of the three sub-ratings.
    pub fn overall_rating(&self) -> f64 {
        f64::from(self.local_transport_rating + self.green_spaces_rating + self.waste_bins_rating) / 3.0
    }

    pub fn author_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Returns the first sub-rating outside `0..=MAX_RATING`, if any.
    pub fn invalid_rating(&self) -> Option<(&'static str, i32)> {
        [
            ("local transport", self.local_transport_rating),
            ("green spaces", self.green_spaces_rating),
            ("waste bins", self.waste_bins_rating),
        ]
        .into_iter()
        .find(|(_, value)| !(0..=MAX_RATING).contains(value))
    }
}

/// One page of a city's reviews plus city-wide aggregates.
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CityReviewElement {
    #[serde(default)]
    pub reviews: Vec<Review>,
    #[serde(rename = "averageLocalTransportRating", default)]
    pub average_local_transport_rating: f64,
    #[serde(rename = "averageGreenSpacesRating", default)]
    pub average_green_spaces_rating: f64,
    #[serde(rename = "averageWasteBinsRating", default)]
    pub average_waste_bins_rating: f64,
    #[serde(rename = "hasPrevious", default)]
    pub has_previous: bool,
    #[serde(rename = "hasNext", default)]
    pub has_next: bool,
    #[serde(rename = "numReviews", default)]
    pub num_reviews: i64,
}

impl CityReviewElement {
    /// Mean of the three per-category averages.
    ///
    /// This is not the mean over individual reviews' overall ratings.
    pub fn average_rating(&self) -> f64 {
        (self.average_local_transport_rating
            + self.average_green_spaces_rating
            + self.average_waste_bins_rating)
            / 3.0
    }

    pub fn city_iata(&self) -> Option<&str> {
        self.reviews.first().map(|r| r.city_iata.as_str())
    }
}
