//! Batch response shaping
//!
//! Turns the rows loaded for a batch into the client projection: reserved
//! rolls grouped by color with per-color sheet totals, the product/size
//! grid, and routing summaries.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::{BatchStatus, ProductionBatch, RollStatus, RoutingStatus, ServiceType};
use sqlx::FromRow;
use uuid::Uuid;

// ============================================================================
// Rows
// ============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct FabricRow {
    pub id: Uuid,
    pub name: String,
    pub reference_code: String,
    pub yield_m_per_kg: Option<Decimal>,
    pub width_m: Option<Decimal>,
    pub grammage: Option<Decimal>,
    pub price_per_kg: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ResponsibleRow {
    pub id: Uuid,
    pub name: String,
    pub role_sector: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ReservedRollRow {
    pub roll_id: Uuid,
    pub barcode: Option<String>,
    pub current_weight_kg: Decimal,
    pub status: RollStatus,
    pub reserved_weight_kg: Decimal,
    pub color_id: Uuid,
    pub color_name: String,
    pub color_hex: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ItemRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub size_id: Uuid,
    pub quantity_per_unit: i32,
    pub planned_quantity: i64,
    pub product_name: String,
    pub sku: String,
    pub size_name: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct SpreadRow {
    pub item_id: Uuid,
    pub group_id: Uuid,
    pub color_id: Uuid,
    pub sheet_count: i32,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RoutingSummary {
    pub id: Uuid,
    pub faction_id: Uuid,
    pub service_type: ServiceType,
    pub status: RoutingStatus,
    pub expected_return_date: Option<NaiveDate>,
}

/// Everything loaded for one batch
#[derive(Debug, Clone)]
pub struct BatchRows {
    pub batch: ProductionBatch,
    pub fabric: FabricRow,
    pub responsible: ResponsibleRow,
    pub rolls: Vec<ReservedRollRow>,
    pub items: Vec<ItemRow>,
    pub spreads: Vec<SpreadRow>,
    pub routings: Vec<RoutingSummary>,
}

// ============================================================================
// Projection
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct BatchResponse {
    pub id: Uuid,
    pub code: String,
    pub fabric_id: Uuid,
    pub responsible_id: Uuid,
    pub status: BatchStatus,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub responsible: ResponsibleRow,
    pub materials: Vec<MaterialGroup>,
    pub grid: Vec<GridLine>,
    pub routings: Vec<RoutingSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MaterialGroup {
    pub fabric_id: Uuid,
    pub name: String,
    pub reference_code: String,
    pub yield_m_per_kg: Option<Decimal>,
    pub width_m: Option<Decimal>,
    pub grammage: Option<Decimal>,
    pub price_per_kg: Option<Decimal>,
    pub total_reserved_kg: Decimal,
    pub colors: Vec<ColorGroup>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColorGroup {
    pub color_id: Uuid,
    pub name: String,
    pub hex_code: Option<String>,
    pub sheet_count: i64,
    pub rolls: Vec<ReservedRoll>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReservedRoll {
    pub id: Uuid,
    pub barcode: Option<String>,
    pub current_weight_kg: Decimal,
    pub reserved_weight_kg: Decimal,
    pub status: RollStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct GridLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub size_id: Uuid,
    pub product_name: String,
    pub sku: String,
    pub size_name: String,
    pub quantity_per_unit: i32,
    pub planned_quantity: i64,
}

/// Sheets per color, counting each input spread once even though every
/// item cut from it carries a copy
pub fn sheets_per_color(spreads: &[SpreadRow]) -> Vec<(Uuid, i64)> {
    let mut seen: HashSet<Uuid> = HashSet::new();
    let mut totals: Vec<(Uuid, i64)> = Vec::new();
    for spread in spreads {
        if !seen.insert(spread.group_id) {
            continue;
        }
        match totals.iter_mut().find(|(color, _)| *color == spread.color_id) {
            Some((_, total)) => *total += i64::from(spread.sheet_count),
            None => totals.push((spread.color_id, i64::from(spread.sheet_count))),
        }
    }
    totals
}

/// Build the client projection of a batch
pub fn shape_batch(rows: BatchRows) -> BatchResponse {
    let sheets = sheets_per_color(&rows.spreads);
    let total_reserved_kg = rows.rolls.iter().map(|r| r.reserved_weight_kg).sum();

    let mut colors: Vec<ColorGroup> = Vec::new();
    for roll in rows.rolls {
        let reserved = ReservedRoll {
            id: roll.roll_id,
            barcode: roll.barcode,
            current_weight_kg: roll.current_weight_kg,
            reserved_weight_kg: roll.reserved_weight_kg,
            status: roll.status,
        };
        match colors.iter_mut().find(|c| c.color_id == roll.color_id) {
            Some(group) => group.rolls.push(reserved),
            None => colors.push(ColorGroup {
                color_id: roll.color_id,
                name: roll.color_name,
                hex_code: roll.color_hex,
                sheet_count: sheets
                    .iter()
                    .find(|(color, _)| *color == roll.color_id)
                    .map(|(_, total)| *total)
                    .unwrap_or(0),
                rolls: vec![reserved],
            }),
        }
    }

    let grid = rows
        .items
        .into_iter()
        .map(|item| GridLine {
            id: item.id,
            product_id: item.product_id,
            size_id: item.size_id,
            product_name: item.product_name,
            sku: item.sku,
            size_name: item.size_name,
            quantity_per_unit: item.quantity_per_unit,
            planned_quantity: item.planned_quantity,
        })
        .collect();

    let batch = rows.batch;
    BatchResponse {
        id: batch.id,
        code: batch.code,
        fabric_id: batch.fabric_id,
        responsible_id: batch.responsible_id,
        status: batch.status,
        note: batch.note,
        created_at: batch.created_at,
        updated_at: batch.updated_at,
        responsible: rows.responsible,
        materials: vec![MaterialGroup {
            fabric_id: rows.fabric.id,
            name: rows.fabric.name,
            reference_code: rows.fabric.reference_code,
            yield_m_per_kg: rows.fabric.yield_m_per_kg,
            width_m: rows.fabric.width_m,
            grammage: rows.fabric.grammage,
            price_per_kg: rows.fabric.price_per_kg,
            total_reserved_kg,
            colors,
        }],
        grid,
        routings: rows.routings,
    }
}
