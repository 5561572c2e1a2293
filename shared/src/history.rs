//! Movement history reconstruction
//!
//! Replays a roll's movements in order to produce a weight trace. Read-only.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ledger::apply_kind;
use crate::models::{FabricRoll, MovementKind, StockMovement};

/// One replayed movement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub movement_id: Uuid,
    pub user_id: Uuid,
    pub kind: MovementKind,
    pub weight_kg: Decimal,
    /// Signed change the movement caused
    pub delta_kg: Decimal,
    pub weight_before_kg: Decimal,
    pub weight_after_kg: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Reconstructed timeline of a roll
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RollHistory {
    pub roll_id: Uuid,
    pub initial_weight_kg: Decimal,
    pub current_weight_kg: Decimal,
    pub consumed_weight_kg: Decimal,
    /// Weight the replay ends on
    pub replayed_weight_kg: Decimal,
    pub movements: Vec<HistoryEntry>,
}

impl RollHistory {
    /// Replay agrees with the stored weight
    pub fn is_ledger_consistent(&self) -> bool {
        self.replayed_weight_kg == self.current_weight_kg
    }
}

/// Starting weight for a replay. Rolls stocked through the ledger open with
/// an entry of their initial weight, so replay starts from zero; rolls
/// without one start from their initial weight.
pub fn opening_balance(initial_weight_kg: Decimal, ordered: &[&StockMovement]) -> Decimal {
    match ordered.first() {
        Some(first) if first.kind == MovementKind::Entry => Decimal::ZERO,
        _ => initial_weight_kg,
    }
}

/// Replay `movements` of `roll` ordered by timestamp then insertion sequence
pub fn reconstruct_history(roll: &FabricRoll, movements: &[StockMovement]) -> RollHistory {
    let mut ordered: Vec<&StockMovement> = movements
        .iter()
        .filter(|m| m.roll_id == roll.id)
        .collect();
    ordered.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then(a.sequence.cmp(&b.sequence))
    });

    let mut running = opening_balance(roll.initial_weight_kg, &ordered);
    let entries = ordered
        .into_iter()
        .map(|m| {
            let before = running;
            running = apply_kind(before, m.kind, m.weight_kg);
            HistoryEntry {
                movement_id: m.id,
                user_id: m.user_id,
                kind: m.kind,
                weight_kg: m.weight_kg,
                delta_kg: running - before,
                weight_before_kg: before,
                weight_after_kg: running,
                created_at: m.created_at,
            }
        })
        .collect();

    RollHistory {
        roll_id: roll.id,
        initial_weight_kg: roll.initial_weight_kg,
        current_weight_kg: roll.current_weight_kg,
        consumed_weight_kg: roll.consumed_weight_kg(),
        replayed_weight_kg: running,
        movements: entries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{plan_movement, RollBalance};
    use crate::models::RollStatus;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn roll(initial: Decimal, current: Decimal) -> FabricRoll {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        FabricRoll {
            id: Uuid::new_v4(),
            fabric_id: Uuid::new_v4(),
            barcode: None,
            initial_weight_kg: initial,
            current_weight_kg: current,
            status: RollStatus::Available,
            created_at: now,
            updated_at: now,
        }
    }

    fn movement(roll_id: Uuid, seq: i64, minutes: i64, kind: MovementKind, weight: Decimal) -> StockMovement {
        StockMovement {
            id: Uuid::new_v4(),
            roll_id,
            user_id: Uuid::nil(),
            kind,
            weight_kg: weight,
            sequence: seq,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap() + Duration::minutes(minutes),
        }
    }

    #[test]
    fn test_entry_then_exit_nets_zero() {
        let r = roll(dec!(10), Decimal::ZERO);
        let movements = vec![
            movement(r.id, 1, 0, MovementKind::Entry, dec!(10)),
            movement(r.id, 2, 5, MovementKind::Exit, dec!(10)),
        ];
        let history = reconstruct_history(&r, &movements);
        assert_eq!(history.movements.len(), 2);
        assert_eq!(history.movements[0].delta_kg, dec!(10));
        assert_eq!(history.movements[1].delta_kg, dec!(-10));
        assert_eq!(history.replayed_weight_kg, Decimal::ZERO);
        assert_eq!(history.consumed_weight_kg, dec!(10));
        assert!(history.is_ledger_consistent());
    }

    #[test]
    fn test_orders_by_time_then_sequence() {
        let r = roll(dec!(50), dec!(20));
        // Same timestamp, inserted out of order
        let movements = vec![
            movement(r.id, 3, 1, MovementKind::Adjustment, dec!(20)),
            movement(r.id, 2, 1, MovementKind::Exit, dec!(5)),
            movement(r.id, 1, 0, MovementKind::Entry, dec!(50)),
        ];
        let history = reconstruct_history(&r, &movements);
        let kinds: Vec<_> = history.movements.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![MovementKind::Entry, MovementKind::Exit, MovementKind::Adjustment]
        );
        assert_eq!(history.movements[1].weight_after_kg, dec!(45));
        assert_eq!(history.movements[2].weight_before_kg, dec!(45));
        assert_eq!(history.movements[2].delta_kg, dec!(-25));
        assert!(history.is_ledger_consistent());
    }

    #[test]
    fn test_without_opening_entry_starts_from_initial() {
        let r = roll(dec!(30), dec!(25));
        let movements = vec![movement(r.id, 1, 0, MovementKind::Exit, dec!(5))];
        let history = reconstruct_history(&r, &movements);
        assert_eq!(history.movements[0].weight_before_kg, dec!(30));
        assert!(history.is_ledger_consistent());
    }

    #[test]
    fn test_other_rolls_ignored_and_replay_is_repeatable() {
        let r = roll(dec!(10), dec!(10));
        let movements = vec![
            movement(r.id, 1, 0, MovementKind::Entry, dec!(10)),
            movement(Uuid::new_v4(), 2, 1, MovementKind::Exit, dec!(3)),
        ];
        let first = reconstruct_history(&r, &movements);
        let second = reconstruct_history(&r, &movements);
        assert_eq!(first.movements.len(), 1);
        assert_eq!(first, second);
    }

    #[test]
    fn test_drift_detected() {
        let r = roll(dec!(10), dec!(4));
        let movements = vec![
            movement(r.id, 1, 0, MovementKind::Entry, dec!(10)),
            movement(r.id, 2, 1, MovementKind::Exit, dec!(5)),
        ];
        assert!(!reconstruct_history(&r, &movements).is_ledger_consistent());
    }

    fn kind_strategy() -> impl Strategy<Value = MovementKind> {
        prop_oneof![
            Just(MovementKind::Entry),
            Just(MovementKind::Exit),
            Just(MovementKind::Adjustment),
            Just(MovementKind::Return),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Any sequence of accepted movements replays to the stored weight
        #[test]
        fn prop_ledger_consistency(
            initial in (1i64..=100_000i64).prop_map(|n| Decimal::new(n, 3)),
            ops in prop::collection::vec(
                (kind_strategy(), (0i64..=100_000i64).prop_map(|n| Decimal::new(n, 3))),
                0..30,
            )
        ) {
            let mut r = roll(initial, Decimal::ZERO);
            let mut balance = RollBalance::from(&r);
            let mut movements = Vec::new();
            let mut seq = 0;

            let opening = plan_movement(&balance, MovementKind::Entry, initial, None).unwrap();
            balance.apply(&opening);
            seq += 1;
            movements.push(movement(r.id, seq, 0, MovementKind::Entry, opening.recorded_weight_kg));

            for (kind, weight) in ops {
                if let Ok(effect) = plan_movement(&balance, kind, weight, None) {
                    balance.apply(&effect);
                    seq += 1;
                    movements.push(movement(r.id, seq, 0, kind, effect.recorded_weight_kg));
                }
            }

            r.current_weight_kg = balance.current_weight_kg;
            let history = reconstruct_history(&r, &movements);
            prop_assert!(history.is_ledger_consistent());
        }
    }
}
