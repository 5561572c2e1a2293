//! WebAssembly module for Garment Production Management
//!
//! Client-side previews for the cutting room, computed with the same rules
//! the server applies:
//! - Planned quantity from sheet counts
//! - Roll history replay
//! - Payment release check
//! - Reservation grouping and validation

use serde::Serialize;
use shared::history::reconstruct_history;
use shared::reservation::{group_by_roll, validate_reservations, ReservationRequest, RollSnapshot};
use shared::{ConferenceState, DomainError, FabricRoll, QualityStatus, StockMovement};
use wasm_bindgen::prelude::*;

/// Error shape handed back to JavaScript
#[derive(Debug, Serialize, PartialEq)]
struct PreviewError {
    code: &'static str,
    message: String,
}

impl From<DomainError> for PreviewError {
    fn from(err: DomainError) -> Self {
        Self {
            code: err.code(),
            message: err.message_pt(),
        }
    }
}

fn bad_input(what: &str, err: serde_json::Error) -> PreviewError {
    PreviewError {
        code: "INVALID_INPUT",
        message: format!("Invalid {} JSON: {}", what, err),
    }
}

fn to_js(err: PreviewError) -> JsValue {
    web_sys::console::warn_1(&JsValue::from_str(&err.message));
    let json = serde_json::to_string(&err).unwrap_or_else(|_| err.message.clone());
    js_sys::Error::new(&json).into()
}

fn to_json<T: Serialize>(value: &T) -> Result<String, PreviewError> {
    serde_json::to_string(value).map_err(|e| PreviewError {
        code: "SERIALIZATION",
        message: e.to_string(),
    })
}

/// Planned units for a product/size line: quantity per unit times the sheets
/// of every spread under it
#[wasm_bindgen]
pub fn planned_quantity(quantity_per_unit: i32, sheet_counts: &[i32]) -> i64 {
    shared::planned_quantity(quantity_per_unit, sheet_counts.iter().copied())
}

fn history_preview(roll_json: &str, movements_json: &str) -> Result<String, PreviewError> {
    let roll: FabricRoll = serde_json::from_str(roll_json).map_err(|e| bad_input("roll", e))?;
    let movements: Vec<StockMovement> =
        serde_json::from_str(movements_json).map_err(|e| bad_input("movements", e))?;
    to_json(&reconstruct_history(&roll, &movements))
}

/// Replay a roll's movements into a weight trace
#[wasm_bindgen]
pub fn reconstruct_roll_history(roll_json: &str, movements_json: &str) -> Result<String, JsValue> {
    history_preview(roll_json, movements_json).map_err(to_js)
}

fn release_check(quality_status: &str, payment_released: bool) -> Result<(), PreviewError> {
    let quality_status: QualityStatus = serde_json::from_value(serde_json::Value::from(quality_status))
        .map_err(|e| bad_input("quality status", e))?;
    ConferenceState {
        quality_status,
        payment_released,
    }
    .ensure_payment_release_allowed()?;
    Ok(())
}

/// Whether an inspection in `quality_status` may carry `payment_released`
#[wasm_bindgen]
pub fn payment_release_allowed(quality_status: &str, payment_released: bool) -> Result<bool, JsValue> {
    match release_check(quality_status, payment_released) {
        Ok(()) => Ok(true),
        Err(err) if err.code == "PAYMENT_RELEASE_NOT_ALLOWED" => Ok(false),
        Err(err) => Err(to_js(err)),
    }
}

fn grouping_preview(requests_json: &str) -> Result<String, PreviewError> {
    let requests: Vec<ReservationRequest> =
        serde_json::from_str(requests_json).map_err(|e| bad_input("reservations", e))?;
    to_json(&group_by_roll(&requests))
}

/// Sum requested weight per roll, first-seen order
#[wasm_bindgen]
pub fn group_reservations(requests_json: &str) -> Result<String, JsValue> {
    grouping_preview(requests_json).map_err(to_js)
}

fn validation_preview(requests_json: &str, rolls_json: &str) -> Result<String, PreviewError> {
    let requests: Vec<ReservationRequest> =
        serde_json::from_str(requests_json).map_err(|e| bad_input("reservations", e))?;
    let rolls: Vec<RollSnapshot> =
        serde_json::from_str(rolls_json).map_err(|e| bad_input("rolls", e))?;
    let validated = validate_reservations(&requests, rolls)?;
    validated.single_fabric()?;
    to_json(&validated.grouped)
}

/// Check reservations against rolls the client already holds, before
/// sending the batch
#[wasm_bindgen]
pub fn validate_reservation_preview(requests_json: &str, rolls_json: &str) -> Result<String, JsValue> {
    validation_preview(requests_json, rolls_json).map_err(to_js)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use shared::reservation::GroupedReservation;
    use shared::RollStatus;
    use uuid::Uuid;

    #[test]
    fn test_planned_quantity() {
        assert_eq!(planned_quantity(2, &[10, 5]), 30);
        assert_eq!(planned_quantity(4, &[]), 0);
    }

    #[test]
    fn test_release_check() {
        assert!(release_check("conforme", true).is_ok());
        assert!(release_check("nao_conforme", false).is_ok());
        assert_eq!(
            release_check("com_defeito", true).unwrap_err().code,
            "PAYMENT_RELEASE_NOT_ALLOWED"
        );
        assert_eq!(release_check("otimo", true).unwrap_err().code, "INVALID_INPUT");
    }

    #[test]
    fn test_grouping_preview() {
        let roll = Uuid::new_v4();
        let json = serde_json::json!([
            { "roll_id": roll, "weight_kg": "1.5", "declared_color_id": null },
            { "roll_id": roll, "weight_kg": "2", "declared_color_id": null }
        ])
        .to_string();

        let grouped: Vec<GroupedReservation> =
            serde_json::from_str(&grouping_preview(&json).unwrap()).unwrap();
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[0].weight_kg, dec!(3.5));
    }

    #[test]
    fn test_validation_preview_reports_color_mismatch() {
        let (roll, fabric, blue, red) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let rolls = serde_json::to_string(&[RollSnapshot {
            id: roll,
            fabric_id: fabric,
            color_id: blue,
            initial_weight_kg: dec!(100),
            current_weight_kg: dec!(70),
            status: RollStatus::Available,
        }])
        .unwrap();
        let requests = serde_json::to_string(&[ReservationRequest {
            roll_id: roll,
            weight_kg: dec!(10),
            declared_color_id: Some(red),
        }])
        .unwrap();

        let err = validation_preview(&requests, &rolls).unwrap_err();
        assert_eq!(err.code, "COLOR_MISMATCH");
    }
}
