//! Quality inspection (conferência) service

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use shared::validation::{validate_conference_items, validate_item_counts};
use shared::{
    Conference, ConferenceItem, ConferencePatch, ConferenceState, DomainError, QualityStatus,
};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::lookup;

const CONFERENCE_COLUMNS: &str = "id, routing_id, responsible_id, inspected_on, quality_status, \
     payment_released, note, created_at, updated_at";

/// Conference service
#[derive(Clone)]
pub struct ConferenceService {
    db: PgPool,
}

/// Inspection with its per-size counts
#[derive(Debug, Clone, Serialize)]
pub struct ConferenceDetail {
    #[serde(flatten)]
    pub conference: Conference,
    pub items: Vec<ConferenceItem>,
}

#[derive(Debug, Deserialize)]
pub struct ConferenceItemInput {
    pub size_id: Uuid,
    pub received_qty: i32,
    #[serde(default)]
    pub defect_qty: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateConferenceInput {
    pub routing_id: Uuid,
    pub responsible_id: Uuid,
    pub inspected_on: Option<NaiveDate>,
    pub quality_status: Option<QualityStatus>,
    pub payment_released: Option<bool>,
    #[validate(length(max = 500))]
    pub note: Option<String>,
    #[serde(default)]
    pub items: Vec<ConferenceItemInput>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateConferenceInput {
    pub responsible_id: Option<Uuid>,
    pub inspected_on: Option<NaiveDate>,
    pub quality_status: Option<QualityStatus>,
    pub payment_released: Option<bool>,
    #[validate(length(max = 500))]
    pub note: Option<String>,
    /// Replaces every item when present
    pub items: Option<Vec<ConferenceItemInput>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConferenceFilter {
    pub quality_status: Option<QualityStatus>,
    pub payment_released: Option<bool>,
    pub routing_id: Option<Uuid>,
}

fn check_items(items: &[ConferenceItemInput]) -> AppResult<()> {
    for item in items {
        validate_item_counts(item.received_qty, item.defect_qty)
            .map_err(|msg| AppError::validation("items", msg))?;
    }
    let counts: Vec<(Uuid, i32, i32)> = items
        .iter()
        .map(|i| (i.size_id, i.received_qty, i.defect_qty))
        .collect();
    validate_conference_items(&counts)?;
    Ok(())
}

impl ConferenceService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn create(&self, input: CreateConferenceInput) -> AppResult<ConferenceDetail> {
        check_items(&input.items)?;

        let state = ConferenceState {
            quality_status: input.quality_status.unwrap_or_default(),
            payment_released: input.payment_released.unwrap_or(false),
        };
        state.ensure_payment_release_allowed()?;

        let mut tx = self.db.begin().await?;

        let routing_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM routings WHERE id = $1)",
        )
        .bind(input.routing_id)
        .fetch_one(&mut *tx)
        .await?;
        if !routing_exists {
            return Err(DomainError::RoutingNotFound(input.routing_id).into());
        }
        lookup::ensure_user(&mut tx, input.responsible_id).await?;

        let conference = sqlx::query_as::<_, Conference>(&format!(
            r#"
            INSERT INTO conferences (routing_id, responsible_id, inspected_on, quality_status, payment_released, note)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            CONFERENCE_COLUMNS
        ))
        .bind(input.routing_id)
        .bind(input.responsible_id)
        .bind(input.inspected_on.unwrap_or_else(|| Utc::now().date_naive()))
        .bind(state.quality_status)
        .bind(state.payment_released)
        .bind(&input.note)
        .fetch_one(&mut *tx)
        .await?;

        let items = insert_items(&mut tx, conference.id, &input.items).await?;

        tx.commit().await?;

        tracing::info!(
            conference_id = %conference.id,
            routing_id = %conference.routing_id,
            quality = %conference.quality_status,
            payment_released = conference.payment_released,
            "Conference recorded"
        );

        Ok(ConferenceDetail { conference, items })
    }

    pub async fn list(&self, filter: ConferenceFilter) -> AppResult<Vec<Conference>> {
        let conferences = sqlx::query_as::<_, Conference>(&format!(
            r#"
            SELECT {}
            FROM conferences
            WHERE ($1::quality_status IS NULL OR quality_status = $1)
              AND ($2::boolean IS NULL OR payment_released = $2)
              AND ($3::uuid IS NULL OR routing_id = $3)
            ORDER BY inspected_on DESC, created_at DESC
            "#,
            CONFERENCE_COLUMNS
        ))
        .bind(filter.quality_status)
        .bind(filter.payment_released)
        .bind(filter.routing_id)
        .fetch_all(&self.db)
        .await?;
        Ok(conferences)
    }

    pub async fn get(&self, conference_id: Uuid) -> AppResult<ConferenceDetail> {
        let conference = sqlx::query_as::<_, Conference>(&format!(
            "SELECT {} FROM conferences WHERE id = $1",
            CONFERENCE_COLUMNS
        ))
        .bind(conference_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(DomainError::ConferenceNotFound(conference_id))?;

        let items = sqlx::query_as::<_, ConferenceItem>(
            r#"
            SELECT id, conference_id, size_id, received_qty, defect_qty
            FROM conference_items
            WHERE conference_id = $1
            "#,
        )
        .bind(conference_id)
        .fetch_all(&self.db)
        .await?;

        Ok(ConferenceDetail { conference, items })
    }

    /// Patch an inspection. The payment gate is checked against the merged
    /// state, so releasing payment on a persisted non-conforming inspection
    /// fails even when the patch does not touch the quality status.
    pub async fn update(
        &self,
        conference_id: Uuid,
        input: UpdateConferenceInput,
    ) -> AppResult<ConferenceDetail> {
        if let Some(items) = &input.items {
            check_items(items)?;
        }

        let mut tx = self.db.begin().await?;

        let current = sqlx::query_as::<_, Conference>(&format!(
            "SELECT {} FROM conferences WHERE id = $1 FOR UPDATE",
            CONFERENCE_COLUMNS
        ))
        .bind(conference_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DomainError::ConferenceNotFound(conference_id))?;

        let merged = ConferenceState::from(&current)
            .apply(ConferencePatch {
                quality_status: input.quality_status,
                payment_released: input.payment_released,
            })
            .map_err(|err| {
                tracing::warn!(%conference_id, "Conference update rejected: {}", err);
                err
            })?;

        if let Some(responsible_id) = input.responsible_id {
            lookup::ensure_user(&mut tx, responsible_id).await?;
        }

        sqlx::query(
            r#"
            UPDATE conferences
            SET responsible_id = COALESCE($2, responsible_id),
                inspected_on = COALESCE($3, inspected_on),
                quality_status = $4,
                payment_released = $5,
                note = COALESCE($6, note),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(conference_id)
        .bind(input.responsible_id)
        .bind(input.inspected_on)
        .bind(merged.quality_status)
        .bind(merged.payment_released)
        .bind(&input.note)
        .execute(&mut *tx)
        .await?;

        if let Some(items) = &input.items {
            sqlx::query("DELETE FROM conference_items WHERE conference_id = $1")
                .bind(conference_id)
                .execute(&mut *tx)
                .await?;
            insert_items(&mut tx, conference_id, items).await?;
        }

        tx.commit().await?;

        self.get(conference_id).await
    }

    pub async fn delete(&self, conference_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM conference_items WHERE conference_id = $1")
            .bind(conference_id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM conferences WHERE id = $1")
            .bind(conference_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(DomainError::ConferenceNotFound(conference_id).into());
        }

        tx.commit().await?;

        tracing::info!(%conference_id, "Conference deleted");
        Ok(())
    }
}

async fn insert_items(
    conn: &mut PgConnection,
    conference_id: Uuid,
    items: &[ConferenceItemInput],
) -> AppResult<Vec<ConferenceItem>> {
    let sizes: Vec<Uuid> = items.iter().map(|i| i.size_id).collect();
    lookup::ensure_sizes(conn, &sizes).await?;

    let mut inserted = Vec::with_capacity(items.len());
    for item in items {
        inserted.push(
            sqlx::query_as::<_, ConferenceItem>(
                r#"
                INSERT INTO conference_items (conference_id, size_id, received_qty, defect_qty)
                VALUES ($1, $2, $3, $4)
                RETURNING id, conference_id, size_id, received_qty, defect_qty
                "#,
            )
            .bind(conference_id)
            .bind(item.size_id)
            .bind(item.received_qty)
            .bind(item.defect_qty)
            .fetch_one(&mut *conn)
            .await?,
        );
    }
    Ok(inserted)
}
