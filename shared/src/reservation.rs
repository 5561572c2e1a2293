//! Reservation validation
//!
//! One routine shared by batch creation, item addition and production-start
//! consumption. It runs before any mutation and either returns the grouped
//! reservations or the first rule broken.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::ledger::{is_positive_weight, normalize_weight};
use crate::models::{RollReservation, RollStatus};

/// A requested claim on a roll
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReservationRequest {
    pub roll_id: Uuid,
    pub weight_kg: Decimal,
    /// Color the caller believes the roll has; unchecked when `None`
    pub declared_color_id: Option<Uuid>,
}

/// Roll as fetched for validation, with its fabric's color
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct RollSnapshot {
    pub id: Uuid,
    pub fabric_id: Uuid,
    pub color_id: Uuid,
    pub initial_weight_kg: Decimal,
    pub current_weight_kg: Decimal,
    pub status: RollStatus,
}

/// Total weight requested from one roll
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupedReservation {
    pub roll_id: Uuid,
    pub weight_kg: Decimal,
}

/// Validated reservations and the rolls they touch
#[derive(Debug, Clone)]
pub struct ValidatedReservations {
    /// One entry per roll in first-requested order
    pub grouped: Vec<GroupedReservation>,
    pub rolls: HashMap<Uuid, RollSnapshot>,
}

/// Sum requested weight per roll, keeping first-seen order
pub fn group_by_roll(requests: &[ReservationRequest]) -> Vec<GroupedReservation> {
    let mut grouped: Vec<GroupedReservation> = Vec::new();
    let mut index: HashMap<Uuid, usize> = HashMap::new();
    for request in requests {
        match index.get(&request.roll_id) {
            Some(&i) => grouped[i].weight_kg += request.weight_kg,
            None => {
                index.insert(request.roll_id, grouped.len());
                grouped.push(GroupedReservation {
                    roll_id: request.roll_id,
                    weight_kg: request.weight_kg,
                });
            }
        }
    }
    for g in &mut grouped {
        g.weight_kg = normalize_weight(g.weight_kg);
    }
    grouped
}

/// Rows a batch holds after `grouped` is reserved on top of `existing`.
///
/// Only rolls touched by `grouped` are returned, in its order. A roll the
/// batch already holds keeps one row whose weight is the running total.
pub fn accumulate_reservations(
    batch_id: Uuid,
    existing: &[RollReservation],
    grouped: &[GroupedReservation],
) -> Vec<RollReservation> {
    grouped
        .iter()
        .map(|g| {
            let held = existing
                .iter()
                .filter(|r| r.batch_id == batch_id && r.roll_id == g.roll_id)
                .map(|r| r.reserved_weight_kg)
                .sum::<Decimal>();
            RollReservation {
                batch_id,
                roll_id: g.roll_id,
                reserved_weight_kg: normalize_weight(held + g.weight_kg),
            }
        })
        .collect()
}

/// Distinct roll ids in first-requested order, for the batch fetch
pub fn requested_roll_ids(requests: &[ReservationRequest]) -> Vec<Uuid> {
    group_by_roll(requests).into_iter().map(|g| g.roll_id).collect()
}

/// Validate `requests` against the fetched `rolls`.
///
/// Rules run in order: non-empty, weights of at least one gram once rounded, every roll found,
/// declared color matches per request, summed weight available per roll.
pub fn validate_reservations(
    requests: &[ReservationRequest],
    rolls: Vec<RollSnapshot>,
) -> DomainResult<ValidatedReservations> {
    if requests.is_empty() {
        return Err(DomainError::NoReservationProvided);
    }
    if let Some(bad) = requests.iter().find(|r| !is_positive_weight(r.weight_kg)) {
        return Err(DomainError::InvalidWeight {
            weight: bad.weight_kg,
        });
    }

    let grouped = group_by_roll(requests);
    let rolls: HashMap<Uuid, RollSnapshot> = rolls.into_iter().map(|r| (r.id, r)).collect();

    if let Some(missing) = grouped.iter().find(|g| !rolls.contains_key(&g.roll_id)) {
        return Err(DomainError::RollNotFound(missing.roll_id));
    }

    for request in requests {
        let (Some(declared), Some(roll)) = (request.declared_color_id, rolls.get(&request.roll_id)) else {
            continue;
        };
        if roll.color_id != declared {
            return Err(DomainError::ColorMismatch {
                roll_id: roll.id,
                declared_color_id: declared,
                actual_color_id: roll.color_id,
            });
        }
    }

    for g in &grouped {
        let Some(roll) = rolls.get(&g.roll_id) else {
            return Err(DomainError::RollNotFound(g.roll_id));
        };
        if roll.current_weight_kg < g.weight_kg {
            return Err(DomainError::InsufficientStock {
                roll_id: roll.id,
                available: roll.current_weight_kg,
                requested: g.weight_kg,
            });
        }
    }

    Ok(ValidatedReservations { grouped, rolls })
}

impl ValidatedReservations {
    fn roll(&self, roll_id: &Uuid) -> DomainResult<&RollSnapshot> {
        self.rolls
            .get(roll_id)
            .ok_or(DomainError::RollNotFound(*roll_id))
    }

    /// Fabric shared by every reserved roll, taken from the first one
    pub fn single_fabric(&self) -> DomainResult<Uuid> {
        let first = self
            .grouped
            .first()
            .ok_or(DomainError::NoReservationProvided)?;
        let fabric_id = self.roll(&first.roll_id)?.fabric_id;
        for g in &self.grouped[1..] {
            let roll = self.roll(&g.roll_id)?;
            if roll.fabric_id != fabric_id {
                return Err(DomainError::RollsSpanMultipleFabrics {
                    roll_id: roll.id,
                    expected_fabric_id: fabric_id,
                    found_fabric_id: roll.fabric_id,
                });
            }
        }
        Ok(fabric_id)
    }

    /// Every reserved roll must belong to the batch fabric
    pub fn ensure_fabric(&self, batch_fabric_id: Uuid) -> DomainResult<()> {
        for g in &self.grouped {
            let roll = self.roll(&g.roll_id)?;
            if roll.fabric_id != batch_fabric_id {
                return Err(DomainError::FabricMismatch {
                    roll_id: roll.id,
                    batch_fabric_id,
                    roll_fabric_id: roll.fabric_id,
                });
            }
        }
        Ok(())
    }
}
