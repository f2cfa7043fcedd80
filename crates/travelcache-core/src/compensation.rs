//! CO2 compensation ledger.
//!
//! Offsets are bought as whole trees: one tree costs €2 and offsets 75 kg of
//! CO2 (37.5 kg per euro). The remote service owns the travel's
//! `CO2Compensated` value; the math here only builds update requests and the
//! optimistic tree count shown before the round trip finishes.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::LocalRecordStore;
use crate::error::CoreError;
use crate::models::{Travel, TravelDetails};
use crate::remote::RemoteTravelService;
use crate::sync::TravelSynchronizer;

/// Kilograms of CO2 offset per euro spent.
pub const CO2_PER_EURO: f64 = 37.5;

/// Price of one tree in euros.
pub const PRICE_PER_TREE: f64 = 2.0;

/// Kilograms of CO2 one tree offsets.
pub const CO2_PER_TREE: f64 = CO2_PER_EURO * PRICE_PER_TREE;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompensationError {
    #[error("{planted} planted {delta:+} trees is outside 0..={needed}")]
    OutOfRange { planted: u32, delta: i64, needed: u32 },

    #[error("travel has no id yet")]
    MissingTravelId,
}

/// Trees to cover `kg` of CO2; any started 75 kg block needs a full tree.
pub fn trees_for_co2(kg: f64) -> u32 {
    if kg <= 0.0 {
        0
    } else {
        (kg / CO2_PER_TREE).ceil() as u32
    }
}

pub fn trees_needed(details: &TravelDetails) -> u32 {
    trees_for_co2(details.total_co2())
}

pub fn trees_planted(travel: &Travel) -> u32 {
    trees_for_co2(travel.co2_compensated)
}

/// Compensated share of the emitted CO2, capped at 1. A travel that emits
/// nothing counts as fully compensated.
pub fn progress_fraction(details: &TravelDetails) -> f64 {
    let total = details.total_co2();
    if total == 0.0 {
        1.0
    } else {
        (details.travel().co2_compensated / total).min(1.0)
    }
}

pub fn co2_for_amount(euros: f64) -> f64 {
    euros * CO2_PER_EURO
}

pub fn amount_for_co2(kg: f64) -> f64 {
    kg / CO2_PER_EURO
}

/// Whole trees an amount buys; change is not spent.
pub fn trees_for_amount(euros: f64) -> u32 {
    if euros <= 0.0 {
        0
    } else {
        (euros / PRICE_PER_TREE).floor() as u32
    }
}

pub fn price_for_trees(trees: u32) -> f64 {
    f64::from(trees) * PRICE_PER_TREE
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompensationPlan {
    pub delta_trees: i64,
    pub price_delta: f64,
    /// New `CO2Compensated` to send.
    pub co2_compensated: f64,
}

/// Validate a tree delta against what the travel still needs.
pub fn plan_compensation(details: &TravelDetails, delta_trees: i64) -> Result<CompensationPlan, CompensationError> {
    let planted = trees_planted(details.travel());
    let needed = trees_needed(details);
    let target = i64::from(planted) + delta_trees;

    if target < 0 || target > i64::from(needed) {
        return Err(CompensationError::OutOfRange {
            planted,
            delta: delta_trees,
            needed,
        });
    }

    Ok(CompensationPlan {
        delta_trees,
        price_delta: delta_trees as f64 * PRICE_PER_TREE,
        co2_compensated: details.travel().co2_compensated + delta_trees as f64 * CO2_PER_TREE,
    })
}

/// Tree count the user is editing, with the last confirmed travel kept for
/// rollback.
#[derive(Debug, Clone)]
pub struct CompensationDraft {
    details: TravelDetails,
    trees: u32,
}

impl CompensationDraft {
    pub fn new(details: TravelDetails) -> Self {
        let trees = trees_planted(details.travel());
        Self { details, trees }
    }

    pub fn trees(&self) -> u32 {
        self.trees
    }

    pub fn trees_needed(&self) -> u32 {
        trees_needed(&self.details)
    }

    pub fn set_trees(&mut self, trees: u32) -> Result<(), CompensationError> {
        let needed = self.trees_needed();
        if trees > needed {
            return Err(CompensationError::OutOfRange {
                planted: trees_planted(self.details.travel()),
                delta: i64::from(trees) - i64::from(trees_planted(self.details.travel())),
                needed,
            });
        }
        self.trees = trees;
        Ok(())
    }

    pub fn delta(&self) -> i64 {
        i64::from(self.trees) - i64::from(trees_planted(self.details.travel()))
    }

    pub fn price_delta(&self) -> f64 {
        self.delta() as f64 * PRICE_PER_TREE
    }

    /// Progress the draft would reach if committed.
    pub fn projected_fraction(&self) -> f64 {
        let total = self.details.total_co2();
        if total == 0.0 {
            1.0
        } else {
            (f64::from(self.trees) * CO2_PER_TREE / total).min(1.0)
        }
    }

    /// Drop the optimistic count and go back to the confirmed one.
    pub fn rollback(&mut self) {
        self.trees = trees_planted(self.details.travel());
    }

    fn accept(&mut self, confirmed: Travel) {
        *self.details.travel_mut() = confirmed;
        self.trees = trees_planted(self.details.travel());
    }
}

/// Drives the remote updates that change compensation or confirmation.
pub struct CompensationLedger<'a, R, S> {
    sync: &'a TravelSynchronizer<R, S>,
}

impl<'a, R, S> CompensationLedger<'a, R, S>
where
    R: RemoteTravelService,
    S: LocalRecordStore,
{
    pub fn new(sync: &'a TravelSynchronizer<R, S>) -> Self {
        Self { sync }
    }

    /// Plant `delta_trees` more (or fewer) trees for a travel. The server's
    /// answer is written to the cache and returned.
    pub async fn compensate(&self, details: &TravelDetails, delta_trees: i64) -> Result<Travel, CoreError> {
        if details.travel_id().is_none() {
            return Err(CompensationError::MissingTravelId.into());
        }
        let plan = plan_compensation(details, delta_trees)?;
        if plan.delta_trees == 0 {
            debug!(travel_id = ?details.travel_id(), "No compensation change");
            return Ok(details.travel().clone());
        }

        let mut updated = details.travel().clone();
        updated.co2_compensated = plan.co2_compensated;

        info!(
            travel_id = ?details.travel_id(),
            delta_trees = plan.delta_trees,
            price_delta = plan.price_delta,
            "Sending compensation update"
        );
        self.sync.push_travel(updated).await
    }

    /// Commit a draft. On failure the draft is rolled back to the last
    /// confirmed tree count before the error is returned, unless the server
    /// already took the update, in which case the draft holds its value.
    pub async fn commit_draft(&self, draft: &mut CompensationDraft) -> Result<Travel, CoreError> {
        let delta = draft.delta();
        match self.compensate(&draft.details, delta).await {
            Ok(confirmed) => {
                draft.accept(confirmed.clone());
                Ok(confirmed)
            }
            Err(e) => {
                match e.applied_travel() {
                    Some(server) => {
                        warn!(error = %e, "Compensation applied remotely, keeping server value in draft");
                        draft.accept(server.clone());
                    }
                    None => {
                        warn!(error = %e, "Compensation failed, rolling back draft");
                        draft.rollback();
                    }
                }
                Err(e)
            }
        }
    }

    /// Mark a travel as actually taken. Already-confirmed travels are left
    /// alone and nothing is sent.
    pub async fn confirm_travel(&self, travel: &Travel) -> Result<Travel, CoreError> {
        if travel.confirmed {
            info!(travel_id = ?travel.travel_id, "Travel already confirmed, nothing to send");
            return Ok(travel.clone());
        }
        if travel.travel_id.is_none() {
            return Err(CompensationError::MissingTravelId.into());
        }

        let mut updated = travel.clone();
        updated.confirmed = true;
        self.sync.push_travel(updated).await
    }
}
