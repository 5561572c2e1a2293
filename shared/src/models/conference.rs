//! Quality inspection (conferência) models and the payment-release gate

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};

/// Inspection of goods returned by a faction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Conference {
    pub id: Uuid,
    pub routing_id: Uuid,
    pub responsible_id: Uuid,
    pub inspected_on: NaiveDate,
    pub quality_status: QualityStatus,
    pub payment_released: bool,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Received and defective quantities for one size
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ConferenceItem {
    pub id: Uuid,
    pub conference_id: Uuid,
    pub size_id: Uuid,
    pub received_qty: i32,
    pub defect_qty: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "quality_status"))]
pub enum QualityStatus {
    #[default]
    #[serde(rename = "conforme")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "conforme"))]
    Conforming,
    #[serde(rename = "nao_conforme")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "nao_conforme"))]
    NonConforming,
    #[serde(rename = "com_defeito")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "com_defeito"))]
    Defective,
}

impl QualityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityStatus::Conforming => "conforme",
            QualityStatus::NonConforming => "nao_conforme",
            QualityStatus::Defective => "com_defeito",
        }
    }
}

impl fmt::Display for QualityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two fields the payment gate looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConferenceState {
    pub quality_status: QualityStatus,
    pub payment_released: bool,
}

/// Partial update of the gated fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConferencePatch {
    pub quality_status: Option<QualityStatus>,
    pub payment_released: Option<bool>,
}

impl ConferenceState {
    pub fn ensure_payment_release_allowed(&self) -> DomainResult<()> {
        if self.payment_released && self.quality_status != QualityStatus::Conforming {
            return Err(DomainError::PaymentReleaseNotAllowed {
                quality_status: self.quality_status.as_str().to_string(),
            });
        }
        Ok(())
    }

    /// Merge a patch over the persisted state and check the result
    pub fn apply(&self, patch: ConferencePatch) -> DomainResult<ConferenceState> {
        let merged = ConferenceState {
            quality_status: patch.quality_status.unwrap_or(self.quality_status),
            payment_released: patch.payment_released.unwrap_or(self.payment_released),
        };
        merged.ensure_payment_release_allowed()?;
        Ok(merged)
    }
}

impl From<&Conference> for ConferenceState {
    fn from(c: &Conference) -> Self {
        Self {
            quality_status: c.quality_status,
            payment_released: c.payment_released,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_allowed_when_conforming() {
        let state = ConferenceState::default();
        let merged = state
            .apply(ConferencePatch {
                payment_released: Some(true),
                ..Default::default()
            })
            .unwrap();
        assert!(merged.payment_released);
    }

    #[test]
    fn test_release_rejected_against_persisted_status() {
        let state = ConferenceState {
            quality_status: QualityStatus::NonConforming,
            payment_released: false,
        };
        let err = state
            .apply(ConferencePatch {
                payment_released: Some(true),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::PaymentReleaseNotAllowed {
                quality_status: "nao_conforme".into()
            }
        );
    }

    #[test]
    fn test_downgrading_released_conference_rejected() {
        let state = ConferenceState {
            quality_status: QualityStatus::Conforming,
            payment_released: true,
        };
        assert!(state
            .apply(ConferencePatch {
                quality_status: Some(QualityStatus::Defective),
                ..Default::default()
            })
            .is_err());

        let revoked = state
            .apply(ConferencePatch {
                quality_status: Some(QualityStatus::Defective),
                payment_released: Some(false),
            })
            .unwrap();
        assert!(!revoked.payment_released);
    }
}
