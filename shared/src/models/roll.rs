//! Fabric roll models

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A physical roll of fabric tracked by weight
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct FabricRoll {
    pub id: Uuid,
    pub fabric_id: Uuid,
    /// Optional unique label printed on the roll
    pub barcode: Option<String>,
    /// Weight at creation, never changes afterwards
    pub initial_weight_kg: Decimal,
    pub current_weight_kg: Decimal,
    pub status: RollStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FabricRoll {
    /// Weight taken out of the roll since it was stocked
    pub fn consumed_weight_kg(&self) -> Decimal {
        self.initial_weight_kg - self.current_weight_kg
    }
}

/// Roll status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "roll_status"))]
pub enum RollStatus {
    #[serde(rename = "disponivel")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "disponivel"))]
    Available,
    #[serde(rename = "reservado")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "reservado"))]
    Reserved,
    #[serde(rename = "em_uso")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "em_uso"))]
    InUse,
    #[serde(rename = "esgotado")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "esgotado"))]
    Exhausted,
    #[serde(rename = "descartado")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "descartado"))]
    Discarded,
}

impl RollStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RollStatus::Available => "disponivel",
            RollStatus::Reserved => "reservado",
            RollStatus::InUse => "em_uso",
            RollStatus::Exhausted => "esgotado",
            RollStatus::Discarded => "descartado",
        }
    }
}

impl fmt::Display for RollStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
