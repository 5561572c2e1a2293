//! Input validations that need more than a single field attribute

use std::collections::HashSet;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::ledger::is_positive_weight;
use crate::models::{ConsumptionInput, SpreadInput};
use crate::types::DateRange;

// ============================================================================
// Stock
// ============================================================================

/// Weights sent when stocking a new roll
pub fn validate_new_roll_weights(initial: Decimal, current: Option<Decimal>) -> Result<(), &'static str> {
    if !is_positive_weight(initial) {
        return Err("Initial weight must be at least 0.001kg");
    }
    if let Some(current) = current {
        if current < Decimal::ZERO {
            return Err("Current weight cannot be negative");
        }
    }
    Ok(())
}

/// Barcodes are optional but never blank
pub fn validate_barcode(barcode: &str) -> Result<(), &'static str> {
    let trimmed = barcode.trim();
    if trimmed.is_empty() {
        return Err("Barcode must not be blank");
    }
    if trimmed.len() > 64 {
        return Err("Barcode must be at most 64 characters");
    }
    Ok(())
}

/// Manual movements move a positive amount
pub fn validate_movement_weight(weight: Decimal) -> Result<(), &'static str> {
    if !is_positive_weight(weight) {
        return Err("Movement weight must be at least 0.001kg");
    }
    Ok(())
}

pub fn validate_date_range(range: &DateRange) -> Result<(), &'static str> {
    match (range.start, range.end) {
        (Some(start), Some(end)) if start > end => Err("Start date must not be after end date"),
        _ => Ok(()),
    }
}

// ============================================================================
// Batches
// ============================================================================

pub fn validate_batch_code(code: &str) -> Result<(), &'static str> {
    if code.trim().is_empty() {
        return Err("Batch code is required");
    }
    Ok(())
}

/// Sheet counts, quantities and roll weights of every spread
pub fn validate_spreads(spreads: &[SpreadInput]) -> Result<(), &'static str> {
    for spread in spreads {
        if spread.sheet_count <= 0 {
            return Err("Sheet count must be positive");
        }
        if spread.items.iter().any(|i| i.quantity_per_unit <= 0) {
            return Err("Quantity must be positive");
        }
        if spread.rolls.iter().any(|r| !is_positive_weight(r.weight_kg)) {
            return Err("Reserved weight must be at least 0.001kg");
        }
    }
    Ok(())
}

pub fn validate_consumption(consumption: &[ConsumptionInput]) -> Result<(), &'static str> {
    if consumption.iter().any(|c| !is_positive_weight(c.weight_kg)) {
        return Err("Consumed weight must be at least 0.001kg");
    }
    Ok(())
}

// ============================================================================
// Inspections
// ============================================================================

/// Per-size counts of an inspection
pub fn validate_conference_items(items: &[(Uuid, i32, i32)]) -> DomainResult<()> {
    for &(size_id, received, defects) in items {
        if defects > received {
            return Err(DomainError::DefectsExceedReceived {
                size_id,
                received,
                defects,
            });
        }
    }
    Ok(())
}

pub fn validate_item_counts(received: i32, defects: i32) -> Result<(), &'static str> {
    if received <= 0 {
        return Err("Received quantity must be positive");
    }
    if defects < 0 {
        return Err("Defect quantity cannot be negative");
    }
    Ok(())
}

/// Ids not present in `found`, in request order and without repeats
pub fn missing_ids(requested: &[Uuid], found: &[Uuid]) -> Vec<Uuid> {
    let found: HashSet<&Uuid> = found.iter().collect();
    let mut seen = HashSet::new();
    requested
        .iter()
        .filter(|id| !found.contains(id) && seen.insert(**id))
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ItemInput, SpreadRollInput};
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    #[test]
    fn test_new_roll_weights() {
        assert!(validate_new_roll_weights(dec!(25), None).is_ok());
        assert!(validate_new_roll_weights(dec!(25), Some(dec!(20))).is_ok());
        assert!(validate_new_roll_weights(Decimal::ZERO, None).is_err());
        assert!(validate_new_roll_weights(dec!(25), Some(dec!(-1))).is_err());
        assert!(validate_new_roll_weights(dec!(0.0004), None).is_err());
        // an empty roll can be stocked
        assert!(validate_new_roll_weights(dec!(25), Some(Decimal::ZERO)).is_ok());
    }

    #[test]
    fn test_sub_gram_weights_rejected() {
        assert!(validate_movement_weight(dec!(0.001)).is_ok());
        assert!(validate_movement_weight(dec!(0.0004)).is_err());
        assert!(validate_consumption(&[ConsumptionInput {
            roll_id: Uuid::new_v4(),
            weight_kg: dec!(0.0004),
        }])
        .is_err());

        let spread = SpreadInput {
            color_id: Uuid::new_v4(),
            sheet_count: 1,
            rolls: vec![SpreadRollInput { roll_id: Uuid::new_v4(), weight_kg: dec!(0.0004) }],
            items: vec![ItemInput {
                product_id: Uuid::new_v4(),
                size_id: Uuid::new_v4(),
                quantity_per_unit: 1,
            }],
        };
        assert_eq!(
            validate_spreads(&[spread]),
            Err("Reserved weight must be at least 0.001kg")
        );
    }

    #[test]
    fn test_barcode() {
        assert!(validate_barcode("7891234567890").is_ok());
        assert!(validate_barcode("   ").is_err());
        assert!(validate_barcode(&"9".repeat(65)).is_err());
    }

    #[test]
    fn test_date_range() {
        let early = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        assert!(validate_date_range(&DateRange { start: Some(early), end: Some(late) }).is_ok());
        assert!(validate_date_range(&DateRange { start: Some(late), end: Some(early) }).is_err());
        assert!(validate_date_range(&DateRange::default()).is_ok());
    }

    #[test]
    fn test_spreads() {
        let mut spread = SpreadInput {
            color_id: Uuid::new_v4(),
            sheet_count: 4,
            rolls: vec![SpreadRollInput { roll_id: Uuid::new_v4(), weight_kg: dec!(3) }],
            items: vec![ItemInput {
                product_id: Uuid::new_v4(),
                size_id: Uuid::new_v4(),
                quantity_per_unit: 2,
            }],
        };
        assert!(validate_spreads(std::slice::from_ref(&spread)).is_ok());

        spread.sheet_count = 0;
        assert_eq!(
            validate_spreads(std::slice::from_ref(&spread)),
            Err("Sheet count must be positive")
        );
    }

    #[test]
    fn test_conference_items() {
        let size = Uuid::new_v4();
        assert!(validate_conference_items(&[(size, 10, 10)]).is_ok());
        assert_eq!(
            validate_conference_items(&[(size, 10, 11)]),
            Err(DomainError::DefectsExceedReceived {
                size_id: size,
                received: 10,
                defects: 11
            })
        );
        assert!(validate_item_counts(0, 0).is_err());
        assert!(validate_item_counts(3, -1).is_err());
    }

    #[test]
    fn test_missing_ids_lists_every_missing_once() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(missing_ids(&[a, b, c, b], &[a]), vec![b, c]);
        assert!(missing_ids(&[a], &[a]).is_empty());
    }
}
