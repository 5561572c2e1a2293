//! Stock ledger arithmetic
//!
//! Decides what a single movement does to a roll: the weight it records,
//! the weight before and after, and the resulting status. Persistence
//! applies the returned [`MovementEffect`] verbatim, so every rule about
//! roll weight lives here.

use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::models::{FabricRoll, MovementKind, RollStatus};

/// Decimal places kept for every weight
pub const WEIGHT_SCALE: u32 = 3;

/// Round a weight to gram precision
pub fn normalize_weight(weight: Decimal) -> Decimal {
    weight.round_dp_with_strategy(WEIGHT_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// At least one gram once rounded
pub fn is_positive_weight(weight: Decimal) -> bool {
    normalize_weight(weight) > Decimal::ZERO
}

/// Weight after applying `kind` with `weight` to `current`, floored at zero
pub fn apply_kind(current: Decimal, kind: MovementKind, weight: Decimal) -> Decimal {
    let next = match kind {
        MovementKind::Entry => current + weight,
        MovementKind::Exit | MovementKind::Return => current - weight,
        MovementKind::Adjustment => weight,
    };
    next.max(Decimal::ZERO)
}

/// The part of a roll the ledger reads and writes
#[derive(Debug, Clone, PartialEq)]
pub struct RollBalance {
    pub roll_id: Uuid,
    pub initial_weight_kg: Decimal,
    pub current_weight_kg: Decimal,
    pub status: RollStatus,
}

impl From<&FabricRoll> for RollBalance {
    fn from(roll: &FabricRoll) -> Self {
        Self {
            roll_id: roll.id,
            initial_weight_kg: roll.initial_weight_kg,
            current_weight_kg: roll.current_weight_kg,
            status: roll.status,
        }
    }
}

impl RollBalance {
    /// Write an accepted effect back into the balance
    pub fn apply(&mut self, effect: &MovementEffect) {
        self.current_weight_kg = effect.weight_after_kg;
        self.status = effect.status_after;
    }
}

/// Outcome of an accepted movement
#[derive(Debug, Clone, PartialEq)]
pub struct MovementEffect {
    pub kind: MovementKind,
    /// Weight written to the movement row, always the amount applied
    pub recorded_weight_kg: Decimal,
    pub weight_before_kg: Decimal,
    pub weight_after_kg: Decimal,
    pub status_after: RollStatus,
}

/// Validate a movement against a roll and compute its effect.
///
/// `status_when_remaining` is the status the caller wants when weight is
/// left on the roll (reservation flows pass `Available` or `InUse`); when
/// `None` the prior status is kept, except that a refilled exhausted roll
/// becomes available again. A roll left at zero is always exhausted, and
/// `Exhausted` is refused for a roll that keeps weight.
///
/// Only an adjustment may carry zero: entries, exits and returns must move
/// at least one gram after rounding.
pub fn plan_movement(
    balance: &RollBalance,
    kind: MovementKind,
    weight: Decimal,
    status_when_remaining: Option<RollStatus>,
) -> DomainResult<MovementEffect> {
    if weight < Decimal::ZERO {
        return Err(DomainError::InvalidWeight { weight });
    }
    let rounded = normalize_weight(weight);
    if rounded == Decimal::ZERO && kind != MovementKind::Adjustment {
        return Err(DomainError::InvalidWeight { weight });
    }
    let weight = rounded;
    let current = balance.current_weight_kg;

    let recorded = match kind {
        MovementKind::Exit | MovementKind::Adjustment => {
            if weight > current {
                return Err(DomainError::InsufficientStock {
                    roll_id: balance.roll_id,
                    available: current,
                    requested: weight,
                });
            }
            weight
        }
        MovementKind::Entry => {
            if current + weight > balance.initial_weight_kg {
                return Err(DomainError::WeightAboveInitial {
                    roll_id: balance.roll_id,
                    initial: balance.initial_weight_kg,
                    requested: current + weight,
                });
            }
            weight
        }
        // Clamped so the recorded amount replays to the stored weight
        MovementKind::Return => weight.min(current),
    };

    let after = apply_kind(current, kind, recorded);
    let status_after = if after <= Decimal::ZERO {
        RollStatus::Exhausted
    } else {
        match status_when_remaining {
            Some(RollStatus::Exhausted) => {
                return Err(DomainError::InvalidRollStatus {
                    roll_id: balance.roll_id,
                    status: RollStatus::Exhausted.as_str().to_string(),
                    weight: after,
                })
            }
            Some(status) => status,
            None if balance.status == RollStatus::Exhausted => RollStatus::Available,
            None => balance.status,
        }
    };

    Ok(MovementEffect {
        kind,
        recorded_weight_kg: recorded,
        weight_before_kg: current,
        weight_after_kg: after,
        status_after,
    })
}

/// Movement that takes a roll from `current` to `target` by delta
pub fn weight_change_movement(current: Decimal, target: Decimal) -> Option<(MovementKind, Decimal)> {
    let target = normalize_weight(target);
    if target > current {
        Some((MovementKind::Entry, target - current))
    } else if target < current {
        Some((MovementKind::Exit, current - target))
    } else {
        None
    }
}

/// Reject a status that contradicts the roll weight
pub fn ensure_status_consistent(roll_id: Uuid, status: RollStatus, weight: Decimal) -> DomainResult<()> {
    let empty = weight <= Decimal::ZERO;
    let exhausted = status == RollStatus::Exhausted;
    if empty != exhausted {
        return Err(DomainError::InvalidRollStatus {
            roll_id,
            status: status.as_str().to_string(),
            weight,
        });
    }
    Ok(())
}
