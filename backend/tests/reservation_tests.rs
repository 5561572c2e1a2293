//! Reservation tests
//!
//! Batch reservations against an in-memory roll book. A reservation is
//! consumption: validated weight leaves the roll through an exit movement.

mod common;

use common::{request, RollBook};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use shared::reservation::{group_by_roll, validate_reservations};
use shared::{DomainError, MovementKind, RollStatus};
use uuid::Uuid;

struct Floor {
    book: RollBook,
    user: Uuid,
    fabric: Uuid,
    blue: Uuid,
    red: Uuid,
}

fn floor() -> Floor {
    Floor {
        book: RollBook::new(),
        user: Uuid::new_v4(),
        fabric: Uuid::new_v4(),
        blue: Uuid::new_v4(),
        red: Uuid::new_v4(),
    }
}

impl Floor {
    fn blue_roll(&mut self, kg: Decimal) -> Uuid {
        self.book.stock(self.fabric, self.blue, kg, kg, self.user).unwrap()
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[cfg(test)]
mod scenarios {
    use super::*;

    #[test]
    fn test_reserve_then_overdraw_then_wrong_color() {
        let mut f = floor();
        let r = f.blue_roll(dec!(100));

        // 30kg under the right color
        let fabric = f.book.reserve(&[request(r, dec!(30), Some(f.blue))], f.user).unwrap();
        assert_eq!(fabric, f.fabric);
        assert_eq!(f.book.weight(r), dec!(70));
        assert_eq!(f.book.roll(r).status, RollStatus::Available);
        let exits: Vec<_> = f
            .book
            .movements_of(r)
            .into_iter()
            .filter(|m| m.kind == MovementKind::Exit)
            .collect();
        assert_eq!(exits.len(), 1);
        assert_eq!(exits[0].weight_kg, dec!(30));

        // 80kg more than the 70 left
        let err = f
            .book
            .reserve(&[request(r, dec!(80), Some(f.blue))], f.user)
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientStock {
                roll_id: r,
                available: dec!(70),
                requested: dec!(80),
            }
        );
        assert_eq!(f.book.weight(r), dec!(70));

        // declared red on a blue roll
        let err = f
            .book
            .reserve(&[request(r, dec!(70), Some(f.red))], f.user)
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::ColorMismatch {
                roll_id: r,
                declared_color_id: f.red,
                actual_color_id: f.blue,
            }
        );
        assert_eq!(f.book.weight(r), dec!(70));
        assert_eq!(f.book.movements_of(r).len(), 2);
    }

    #[test]
    fn test_failure_on_third_roll_changes_nothing() {
        let mut f = floor();
        let r1 = f.blue_roll(dec!(50));
        let r2 = f.blue_roll(dec!(50));
        let r3 = f.blue_roll(dec!(5));
        let movements_before = f.book.movements.len();

        let err = f
            .book
            .reserve(
                &[
                    request(r1, dec!(10), None),
                    request(r2, dec!(10), None),
                    request(r3, dec!(6), None),
                ],
                f.user,
            )
            .unwrap_err();

        assert!(matches!(err, DomainError::InsufficientStock { roll_id, .. } if roll_id == r3));
        assert_eq!(f.book.weight(r1), dec!(50));
        assert_eq!(f.book.weight(r2), dec!(50));
        assert_eq!(f.book.weight(r3), dec!(5));
        assert_eq!(f.book.movements.len(), movements_before);
    }

    #[test]
    fn test_reserving_everything_exhausts_roll() {
        let mut f = floor();
        let r = f.blue_roll(dec!(12.5));
        f.book.reserve(&[request(r, dec!(12.5), Some(f.blue))], f.user).unwrap();
        assert_eq!(f.book.roll(r).status, RollStatus::Exhausted);
    }

    #[test]
    fn test_repeated_roll_is_summed_before_stock_check() {
        let mut f = floor();
        let r = f.blue_roll(dec!(20));

        let err = f
            .book
            .reserve(&[request(r, dec!(12), None), request(r, dec!(9), None)], f.user)
            .unwrap_err();
        assert!(matches!(err, DomainError::InsufficientStock { requested, .. } if requested == dec!(21)));

        f.book
            .reserve(&[request(r, dec!(12), None), request(r, dec!(8), None)], f.user)
            .unwrap();
        assert_eq!(f.book.weight(r), Decimal::ZERO);
        // one exit per roll, not per request
        assert_eq!(f.book.movements_of(r).len(), 2);
    }

    #[test]
    fn test_rolls_of_two_fabrics_rejected() {
        let mut f = floor();
        let r1 = f.blue_roll(dec!(10));
        let other_fabric = Uuid::new_v4();
        let r2 = f.book.stock(other_fabric, f.blue, dec!(10), dec!(10), f.user).unwrap();

        let err = f
            .book
            .reserve(&[request(r1, dec!(1), None), request(r2, dec!(1), None)], f.user)
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::RollsSpanMultipleFabrics {
                roll_id: r2,
                expected_fabric_id: f.fabric,
                found_fabric_id: other_fabric,
            }
        );
        assert_eq!(f.book.weight(r1), dec!(10));
    }

    #[test]
    fn test_sub_gram_request_rejected_without_moving_stock() {
        let mut f = floor();
        let r = f.blue_roll(dec!(10));
        let movements_before = f.book.movements.len();

        let err = f
            .book
            .reserve(&[request(r, dec!(0.0004), Some(f.blue))], f.user)
            .unwrap_err();

        assert_eq!(err, DomainError::InvalidWeight { weight: dec!(0.0004) });
        assert_eq!(f.book.weight(r), dec!(10));
        assert_eq!(f.book.movements.len(), movements_before);
    }

    #[test]
    fn test_empty_request_list_rejected() {
        let mut f = floor();
        assert_eq!(
            f.book.reserve(&[], f.user).unwrap_err(),
            DomainError::NoReservationProvided
        );
    }

    #[test]
    fn test_unknown_roll_rejected() {
        let mut f = floor();
        let ghost = Uuid::new_v4();
        assert_eq!(
            f.book.reserve(&[request(ghost, dec!(1), None)], f.user).unwrap_err(),
            DomainError::RollNotFound(ghost)
        );
    }

    #[test]
    fn test_fabric_check_for_added_items() {
        let mut f = floor();
        let r = f.blue_roll(dec!(10));
        let requests = [request(r, dec!(2), Some(f.blue))];
        let validated = validate_reservations(&requests, f.book.snapshots(&requests)).unwrap();

        assert!(validated.ensure_fabric(f.fabric).is_ok());
        let batch_fabric = Uuid::new_v4();
        assert_eq!(
            validated.ensure_fabric(batch_fabric).unwrap_err(),
            DomainError::FabricMismatch {
                roll_id: r,
                batch_fabric_id: batch_fabric,
                roll_fabric_id: f.fabric,
            }
        );
    }

    #[test]
    fn test_grouping_keeps_first_seen_order() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let grouped = group_by_roll(&[
            request(b, dec!(1), None),
            request(a, dec!(2), None),
            request(b, dec!(0.5), None),
        ]);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].roll_id, b);
        assert_eq!(grouped[0].weight_kg, dec!(1.5));
        assert_eq!(grouped[1].roll_id, a);
    }
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// A wrong declared color fails and moves nothing
    #[test]
    fn prop_color_mismatch_moves_nothing(kg in 1u32..100_000u32, take in 1u32..100_000u32) {
        let mut f = floor();
        let r = f.blue_roll(Decimal::new(kg as i64, 3));
        let before = f.book.clone();

        let result = f.book.reserve(&[request(r, Decimal::new(take as i64, 3), Some(f.red))], f.user);

        prop_assert!(
            matches!(result, Err(DomainError::ColorMismatch { .. })),
            "expected ColorMismatch"
        );
        prop_assert_eq!(f.book.weight(r), before.weight(r));
        prop_assert_eq!(f.book.movements.len(), before.movements.len());
    }

    /// Any multi-roll reservation either applies in full or not at all
    #[test]
    fn prop_reservation_is_all_or_nothing(
        rolls in prop::collection::vec((1u32..50_000u32, 1u32..60_000u32), 1..6)
    ) {
        let mut f = floor();
        let mut requests = Vec::new();
        let mut stocked = Vec::new();
        for (kg, take) in &rolls {
            let id = f.blue_roll(Decimal::new(*kg as i64, 3));
            requests.push(request(id, Decimal::new(*take as i64, 3), Some(f.blue)));
            stocked.push(id);
        }
        let before: Vec<Decimal> = stocked.iter().map(|id| f.book.weight(*id)).collect();
        let every_fits = rolls.iter().all(|(kg, take)| take <= kg);

        let result = f.book.reserve(&requests, f.user);
        prop_assert_eq!(result.is_ok(), every_fits);

        for ((id, (_, take)), weight_before) in stocked.iter().zip(&rolls).zip(&before) {
            let expected = if every_fits {
                *weight_before - Decimal::new(*take as i64, 3)
            } else {
                *weight_before
            };
            prop_assert_eq!(f.book.weight(*id), expected);
        }
    }
}
