//! Data models for travels and city reviews.
//!
//! - `Segment`, `Vehicle`: one leg of a trip
//! - `Travel`: the booking record the remote service owns
//! - `TravelDetails`: a travel with its segments, rebuilt on every read
//! - `Review`, `CityReviewElement`: review records and fetched review pages

pub mod review;
pub mod segment;
pub mod travel;

pub use review::{CityReviewElement, Review, MAX_RATING};
pub use segment::{Segment, Vehicle};
pub use travel::{Travel, TravelDetails};
