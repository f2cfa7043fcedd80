//! Utility functions for display formatting.

pub mod format;

pub use format::{format_co2, format_euros, format_hours_minutes};
