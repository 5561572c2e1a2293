//! Production batch (lote) models, status table and spread normalisation

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::reservation::ReservationRequest;

/// A planned production run against one fabric
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ProductionBatch {
    pub id: Uuid,
    pub code: String,
    pub fabric_id: Uuid,
    pub responsible_id: Uuid,
    pub status: BatchStatus,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Batch status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "batch_status"))]
pub enum BatchStatus {
    #[default]
    #[serde(rename = "planejado")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "planejado"))]
    Planned,
    #[serde(rename = "em_producao")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "em_producao"))]
    InProduction,
    #[serde(rename = "concluido")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "concluido"))]
    Completed,
    #[serde(rename = "cancelado")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "cancelado"))]
    Cancelled,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Planned => "planejado",
            BatchStatus::InProduction => "em_producao",
            BatchStatus::Completed => "concluido",
            BatchStatus::Cancelled => "cancelado",
        }
    }

    /// Completed and cancelled batches accept no new items
    pub fn is_closed(&self) -> bool {
        matches!(self, BatchStatus::Completed | BatchStatus::Cancelled)
    }

    pub fn can_transition_to(&self, next: BatchStatus) -> bool {
        matches!(
            (self, next),
            (BatchStatus::Planned, BatchStatus::InProduction)
                | (BatchStatus::Planned, BatchStatus::Cancelled)
                | (BatchStatus::InProduction, BatchStatus::Completed)
                | (BatchStatus::InProduction, BatchStatus::Cancelled)
        )
    }

    /// Check a requested status change. Returns `Ok(None)` when the
    /// requested status equals the current one.
    pub fn ensure_transition(&self, next: BatchStatus) -> DomainResult<Option<BatchStatus>> {
        if *self == next {
            return Ok(None);
        }
        if !self.can_transition_to(next) {
            return Err(DomainError::InvalidStatusTransition {
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            });
        }
        Ok(Some(next))
    }

    /// The only transition that may carry a roll consumption list
    pub fn starts_production(&self, next: BatchStatus) -> bool {
        *self == BatchStatus::Planned && next == BatchStatus::InProduction
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reserved weight linking a batch to a roll
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct RollReservation {
    pub batch_id: Uuid,
    pub roll_id: Uuid,
    /// Cumulative across every reservation of this roll for this batch
    pub reserved_weight_kg: Decimal,
}

/// Planned product/size line of a batch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct BatchItem {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub product_id: Uuid,
    pub size_id: Uuid,
    pub quantity_per_unit: i32,
    pub planned_quantity: i64,
}

/// Colored spread (enfesto) cut for an item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Spread {
    pub id: Uuid,
    pub item_id: Uuid,
    /// Shared by every item row produced from the same input spread
    pub group_id: Uuid,
    pub color_id: Uuid,
    pub sheet_count: i32,
}

/// Roll drawn by a spread
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SpreadRoll {
    pub spread_id: Uuid,
    pub roll_id: Uuid,
    pub weight_kg: Decimal,
}

/// Initial roll reservation sent with batch creation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReservationInput {
    pub roll_id: Uuid,
    pub reserved_weight_kg: Decimal,
    /// Declared color, checked against the roll's fabric color when present
    pub color_id: Option<Uuid>,
}

/// Roll weight drawn by a spread
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpreadRollInput {
    pub roll_id: Uuid,
    pub weight_kg: Decimal,
}

/// Product/size line cut from a spread
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemInput {
    pub product_id: Uuid,
    pub size_id: Uuid,
    pub quantity_per_unit: i32,
}

/// One spread as sent by the cutting room
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpreadInput {
    pub color_id: Uuid,
    pub sheet_count: i32,
    pub rolls: Vec<SpreadRollInput>,
    pub items: Vec<ItemInput>,
}

/// Roll consumed when a batch starts production
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsumptionInput {
    pub roll_id: Uuid,
    pub weight_kg: Decimal,
}

/// Spread metadata attached to a normalised item
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSpread {
    /// Index of the input spread this came from
    pub group: usize,
    pub color_id: Uuid,
    pub sheet_count: i32,
    pub rolls: Vec<SpreadRollInput>,
}

/// One batch item row ready to insert
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedItem {
    pub product_id: Uuid,
    pub size_id: Uuid,
    pub quantity_per_unit: i32,
    pub spreads: Vec<NormalizedSpread>,
}

impl NormalizedItem {
    /// quantity per unit times the sheets of every spread under the item
    pub fn planned_quantity(&self) -> i64 {
        planned_quantity(
            self.quantity_per_unit,
            self.spreads.iter().map(|s| s.sheet_count),
        )
    }
}

/// Output units scale with the number of layers cut
pub fn planned_quantity(quantity_per_unit: i32, sheet_counts: impl IntoIterator<Item = i32>) -> i64 {
    let sheets: i64 = sheet_counts.into_iter().map(i64::from).sum();
    i64::from(quantity_per_unit) * sheets
}

/// Expand spreads into one item per product/size line, each carrying a copy
/// of its spread's color, sheet count and rolls
pub fn normalize_spreads(spreads: &[SpreadInput]) -> DomainResult<Vec<NormalizedItem>> {
    if spreads.is_empty() {
        return Err(DomainError::EmptySpread { missing: "item" });
    }
    if spreads.iter().any(|s| s.items.is_empty()) {
        return Err(DomainError::EmptySpread { missing: "item" });
    }
    if spreads.iter().any(|s| s.rolls.is_empty()) {
        return Err(DomainError::EmptySpread { missing: "rolo" });
    }

    Ok(spreads
        .iter()
        .enumerate()
        .flat_map(|(group, spread)| {
            spread.items.iter().map(move |item| NormalizedItem {
                product_id: item.product_id,
                size_id: item.size_id,
                quantity_per_unit: item.quantity_per_unit,
                spreads: vec![NormalizedSpread {
                    group,
                    color_id: spread.color_id,
                    sheet_count: spread.sheet_count,
                    rolls: spread.rolls.clone(),
                }],
            })
        })
        .collect())
}

/// One reservation request per roll drawn by a spread, declared under the
/// spread's color. Items sharing a spread do not multiply its weight.
pub fn spread_reservations(spreads: &[SpreadInput]) -> Vec<ReservationRequest> {
    spreads
        .iter()
        .flat_map(|spread| {
            spread.rolls.iter().map(move |roll| ReservationRequest {
                roll_id: roll.roll_id,
                weight_kg: roll.weight_kg,
                declared_color_id: Some(spread.color_id),
            })
        })
        .collect()
}

/// Distinct product and size ids referenced by normalised items, in first
/// seen order
pub fn referenced_products_and_sizes(items: &[NormalizedItem]) -> (Vec<Uuid>, Vec<Uuid>) {
    let mut products: Vec<Uuid> = Vec::new();
    let mut sizes: Vec<Uuid> = Vec::new();
    for item in items {
        if !products.contains(&item.product_id) {
            products.push(item.product_id);
        }
        if !sizes.contains(&item.size_id) {
            sizes.push(item.size_id);
        }
    }
    (products, sizes)
}
