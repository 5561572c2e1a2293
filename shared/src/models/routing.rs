//! Outbound routing (direcionamento) models and status table

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};

/// A batch sent to a faction for one service step
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Routing {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub faction_id: Uuid,
    pub service_type: ServiceType,
    pub status: RoutingStatus,
    pub departure_date: NaiveDate,
    pub expected_return_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// External contractor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Faction {
    pub id: Uuid,
    pub name: String,
    pub status: FactionStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "faction_status", rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum FactionStatus {
    Ativo,
    Inativo,
}

/// Service performed by a faction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "service_type"))]
pub enum ServiceType {
    #[serde(rename = "costura")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "costura"))]
    Sewing,
    #[serde(rename = "estampa")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "estampa"))]
    Printing,
    #[serde(rename = "tingimento")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "tingimento"))]
    Dyeing,
    #[serde(rename = "acabamento")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "acabamento"))]
    Finishing,
    #[serde(rename = "corte")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "corte"))]
    Cutting,
    #[serde(rename = "outro")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "outro"))]
    Other,
}

/// Routing status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "routing_status"))]
pub enum RoutingStatus {
    #[default]
    #[serde(rename = "enviado")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "enviado"))]
    Sent,
    #[serde(rename = "em_processamento")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "em_processamento"))]
    Processing,
    #[serde(rename = "finalizado")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "finalizado"))]
    Finished,
    #[serde(rename = "cancelado")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "cancelado"))]
    Cancelled,
}

impl RoutingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutingStatus::Sent => "enviado",
            RoutingStatus::Processing => "em_processamento",
            RoutingStatus::Finished => "finalizado",
            RoutingStatus::Cancelled => "cancelado",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RoutingStatus::Finished | RoutingStatus::Cancelled)
    }

    pub fn can_transition_to(&self, next: RoutingStatus) -> bool {
        matches!(
            (self, next),
            (RoutingStatus::Sent, RoutingStatus::Processing)
                | (RoutingStatus::Sent, RoutingStatus::Cancelled)
                | (RoutingStatus::Processing, RoutingStatus::Finished)
        )
    }

    /// Same semantics as the batch table: re-sending the current status is
    /// accepted and changes nothing
    pub fn ensure_transition(&self, next: RoutingStatus) -> DomainResult<Option<RoutingStatus>> {
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
}

impl fmt::Display for RoutingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Faction {
    /// Only active factions receive new routings
    pub fn ensure_active(&self) -> DomainResult<()> {
        match self.status {
            FactionStatus::Ativo => Ok(()),
            FactionStatus::Inativo => Err(DomainError::FactionInactive(self.id)),
        }
    }
}
