//! Stock movement models

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An immutable ledger entry for one roll
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockMovement {
    pub id: Uuid,
    pub roll_id: Uuid,
    pub user_id: Uuid,
    pub kind: MovementKind,
    /// Always non-negative; the kind decides the direction
    pub weight_kg: Decimal,
    /// Monotonic insertion order, breaks timestamp ties
    pub sequence: i64,
    pub created_at: DateTime<Utc>,
}

/// Kind of stock movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "movement_kind"))]
pub enum MovementKind {
    /// Adds weight
    #[serde(rename = "entrada")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "entrada"))]
    Entry,
    /// Removes weight
    #[serde(rename = "saida")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "saida"))]
    Exit,
    /// Sets weight to an absolute value
    #[serde(rename = "ajuste")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "ajuste"))]
    Adjustment,
    /// Removes weight sent back to the supplier
    #[serde(rename = "devolucao")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "devolucao"))]
    Return,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Entry => "entrada",
            MovementKind::Exit => "saida",
            MovementKind::Adjustment => "ajuste",
            MovementKind::Return => "devolucao",
        }
    }

    /// Whether the movement lowers the roll weight by its amount
    pub fn is_decrement(&self) -> bool {
        matches!(self, MovementKind::Exit | MovementKind::Return)
    }
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
