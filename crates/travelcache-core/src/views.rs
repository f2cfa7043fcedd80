//! Derived travel lists.
//!
//! `filtered_and_sorted` is a pure function of the travel list, the
//! completed/scheduled filter, the sort option and the current time. The
//! `TravelListView` wrapper holds those inputs and recomputes its output
//! whenever one of them is changed through its setters.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::compensation::{trees_needed, trees_planted};
use crate::models::TravelDetails;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOption {
    #[default]
    DepartureDate,
    Co2Emitted,
    Price,
    Co2CompensationRate,
}

impl SortOption {
    pub fn label(&self) -> &'static str {
        match self {
            SortOption::DepartureDate => "Departure date",
            SortOption::Co2Emitted => "CO2 emitted",
            SortOption::Price => "Price",
            SortOption::Co2CompensationRate => "CO2 compensation rate",
        }
    }
}

/// Travel id order, ascending or descending. A missing id sorts after every
/// assigned one in both directions.
fn cmp_travel_id(a: &TravelDetails, b: &TravelDetails, descending: bool) -> Ordering {
    match (a.travel_id(), b.travel_id()) {
        (Some(x), Some(y)) if descending => y.cmp(&x),
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Nothing emitted and nothing compensated: nothing left to do.
fn is_fully_green(d: &TravelDetails) -> bool {
    d.total_co2() == 0.0 && d.travel().co2_compensated == 0.0
}

fn compensation_ratio(d: &TravelDetails) -> f64 {
    let total = d.total_co2();
    if total == 0.0 {
        f64::INFINITY
    } else {
        d.travel().co2_compensated / total
    }
}

/// Total order for one sort option. Descending keys break ties by higher
/// travel id first; the compensation rate breaks residual ties by ascending id.
pub fn compare(sort: SortOption, a: &TravelDetails, b: &TravelDetails) -> Ordering {
    match sort {
        SortOption::DepartureDate => {
            let date_a = a.departure_segment().map(|s| s.date_time);
            let date_b = b.departure_segment().map(|s| s.date_time);
            date_b.cmp(&date_a).then_with(|| cmp_travel_id(a, b, true))
        }
        SortOption::Co2Emitted => b
            .total_co2()
            .total_cmp(&a.total_co2())
            .then_with(|| cmp_travel_id(a, b, true)),
        SortOption::Price => b
            .total_price()
            .total_cmp(&a.total_price())
            .then_with(|| cmp_travel_id(a, b, true)),
        SortOption::Co2CompensationRate => match (is_fully_green(a), is_fully_green(b)) {
            (true, true) => cmp_travel_id(a, b, false),
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => compensation_ratio(a)
                .total_cmp(&compensation_ratio(b))
                .then_with(|| b.total_co2().total_cmp(&a.total_co2()))
                .then_with(|| cmp_travel_id(a, b, false)),
        },
    }
}

/// Travels for one tab: completed (arrived by `now`) or scheduled, sorted.
/// Travels without segments appear in neither.
pub fn filtered_and_sorted(
    travels: &[TravelDetails],
    show_completed: bool,
    sort: SortOption,
    now: DateTime<Utc>,
) -> Vec<&TravelDetails> {
    let mut selected: Vec<&TravelDetails> = travels
        .iter()
        .filter(|d| !d.is_empty() && d.is_completed(now) == show_completed)
        .collect();

    selected.sort_by(|a, b| compare(sort, a, b));
    selected
}

/// Holds the inputs of the travel list and its derived output.
#[derive(Debug, Clone, Default)]
pub struct TravelListView {
    travels: Vec<TravelDetails>,
    show_completed: bool,
    sort_option: SortOption,
    displayed: Vec<TravelDetails>,
}

impl TravelListView {
    pub fn new(travels: Vec<TravelDetails>, show_completed: bool, sort_option: SortOption) -> Self {
        let mut view = Self {
            travels,
            show_completed,
            sort_option,
            displayed: Vec::new(),
        };
        view.recompute();
        view
    }

    pub fn set_travels(&mut self, travels: Vec<TravelDetails>) {
        self.travels = travels;
        self.recompute();
    }

    pub fn set_show_completed(&mut self, show_completed: bool) {
        self.show_completed = show_completed;
        self.recompute();
    }

    pub fn set_sort_option(&mut self, sort_option: SortOption) {
        self.sort_option = sort_option;
        self.recompute();
    }

    /// Re-derive against the current time. Call after the clock may have
    /// moved a travel from scheduled to completed.
    pub fn recompute(&mut self) {
        self.recompute_at(Utc::now());
    }

    pub fn recompute_at(&mut self, now: DateTime<Utc>) {
        self.displayed = filtered_and_sorted(&self.travels, self.show_completed, self.sort_option, now)
            .into_iter()
            .cloned()
            .collect();
    }

    pub fn displayed(&self) -> &[TravelDetails] {
        &self.displayed
    }

    pub fn travels(&self) -> &[TravelDetails] {
        &self.travels
    }

    pub fn show_completed(&self) -> bool {
        self.show_completed
    }

    pub fn sort_option(&self) -> SortOption {
        self.sort_option
    }
}

/// Totals over a set of travels, for the profile summary.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TravelStats {
    pub travels: usize,
    pub distance: f64,
    pub co2_emitted: f64,
    pub co2_compensated: f64,
    pub trees_planted: u32,
    pub trees_needed: u32,
}

impl TravelStats {
    pub fn from_travels<'a>(travels: impl IntoIterator<Item = &'a TravelDetails>) -> Self {
        travels.into_iter().fold(Self::default(), |mut stats, d| {
            stats.travels += 1;
            stats.distance += d.total_distance();
            stats.co2_emitted += d.total_co2();
            stats.co2_compensated += d.travel().co2_compensated;
            stats.trees_planted += trees_planted(d.travel());
            stats.trees_needed += trees_needed(d);
            stats
        })
    }

    /// CO2 emitted but not yet offset.
    pub fn co2_outstanding(&self) -> f64 {
        (self.co2_emitted - self.co2_compensated).max(0.0)
    }
}
