//! Browser-side checks of the exported previews

#![cfg(target_arch = "wasm32")]

use garment_production_wasm::{group_reservations, payment_release_allowed, planned_quantity};
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn planned_quantity_from_sheets() {
    assert_eq!(planned_quantity(3, &[4, 6]), 30);
}

#[wasm_bindgen_test]
fn payment_gate_in_browser() {
    assert_eq!(payment_release_allowed("conforme", true).ok(), Some(true));
    assert_eq!(payment_release_allowed("nao_conforme", true).ok(), Some(false));
    assert!(payment_release_allowed("desconhecido", true).is_err());
}

#[wasm_bindgen_test]
fn malformed_reservations_rejected() {
    assert!(group_reservations("not json").is_err());
}
