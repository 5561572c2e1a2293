//! Routing (direcionamento) service

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use shared::{BatchStatus, DomainError, Routing, RoutingStatus, ServiceType};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::batch::lock_batch;
use crate::services::lookup;

const ROUTING_COLUMNS: &str = "id, batch_id, faction_id, service_type, status, departure_date, \
     expected_return_date, created_at, updated_at";

/// Routing service
#[derive(Clone)]
pub struct RoutingService {
    db: PgPool,
}

#[derive(Debug, Deserialize)]
pub struct CreateRoutingInput {
    pub batch_id: Uuid,
    pub faction_id: Uuid,
    pub service_type: ServiceType,
    /// Defaults to today
    pub departure_date: Option<NaiveDate>,
    pub expected_return_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateRoutingInput {
    pub status: Option<RoutingStatus>,
    pub service_type: Option<ServiceType>,
    pub departure_date: Option<NaiveDate>,
    pub expected_return_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RoutingFilter {
    pub status: Option<RoutingStatus>,
    pub faction_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
}

fn ensure_dates(departure: NaiveDate, expected_return: Option<NaiveDate>) -> AppResult<()> {
    if let Some(expected) = expected_return {
        if expected < departure {
            return Err(AppError::validation(
                "expected_return_date",
                "Expected return cannot be before departure",
            ));
        }
    }
    Ok(())
}

impl RoutingService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Send a batch to an active faction. The first routing of a planned
    /// batch starts its production.
    pub async fn create(&self, input: CreateRoutingInput) -> AppResult<Routing> {
        let departure = input
            .departure_date
            .unwrap_or_else(|| Utc::now().date_naive());
        ensure_dates(departure, input.expected_return_date)?;

        let mut tx = self.db.begin().await?;

        let batch = lock_batch(&mut tx, input.batch_id).await?;
        lookup::faction(&mut tx, input.faction_id)
            .await?
            .ensure_active()?;

        let routing = sqlx::query_as::<_, Routing>(&format!(
            r#"
            INSERT INTO routings (batch_id, faction_id, service_type, status, departure_date, expected_return_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            ROUTING_COLUMNS
        ))
        .bind(input.batch_id)
        .bind(input.faction_id)
        .bind(input.service_type)
        .bind(RoutingStatus::Sent)
        .bind(departure)
        .bind(input.expected_return_date)
        .fetch_one(&mut *tx)
        .await?;

        if batch.status == BatchStatus::Planned {
            start_production(&mut tx, batch.id).await?;
        }

        tx.commit().await?;

        tracing::info!(
            routing_id = %routing.id,
            batch_id = %routing.batch_id,
            faction_id = %routing.faction_id,
            service = ?routing.service_type,
            "Batch routed"
        );
        Ok(routing)
    }

    pub async fn list(&self, filter: RoutingFilter) -> AppResult<Vec<Routing>> {
        let routings = sqlx::query_as::<_, Routing>(&format!(
            r#"
            SELECT {}
            FROM routings
            WHERE ($1::routing_status IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR faction_id = $2)
              AND ($3::uuid IS NULL OR batch_id = $3)
            ORDER BY created_at DESC
            "#,
            ROUTING_COLUMNS
        ))
        .bind(filter.status)
        .bind(filter.faction_id)
        .bind(filter.batch_id)
        .fetch_all(&self.db)
        .await?;
        Ok(routings)
    }

    pub async fn get(&self, routing_id: Uuid) -> AppResult<Routing> {
        let routing = sqlx::query_as::<_, Routing>(&format!(
            "SELECT {} FROM routings WHERE id = $1",
            ROUTING_COLUMNS
        ))
        .bind(routing_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(DomainError::RoutingNotFound(routing_id))?;
        Ok(routing)
    }

    /// Move the routing through its status table and/or reschedule it
    pub async fn update(&self, routing_id: Uuid, input: UpdateRoutingInput) -> AppResult<Routing> {
        let mut tx = self.db.begin().await?;
        let current = lock_routing(&mut tx, routing_id).await?;

        let next_status = match input.status {
            Some(requested) => current.status.ensure_transition(requested).map_err(|err| {
                tracing::warn!(%routing_id, "Routing transition rejected: {}", err);
                err
            })?,
            None => None,
        };

        ensure_dates(
            input.departure_date.unwrap_or(current.departure_date),
            input.expected_return_date.or(current.expected_return_date),
        )?;

        let routing = sqlx::query_as::<_, Routing>(&format!(
            r#"
            UPDATE routings
            SET status = COALESCE($2, status),
                service_type = COALESCE($3, service_type),
                departure_date = COALESCE($4, departure_date),
                expected_return_date = COALESCE($5, expected_return_date),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            ROUTING_COLUMNS
        ))
        .bind(routing_id)
        .bind(next_status)
        .bind(input.service_type)
        .bind(input.departure_date)
        .bind(input.expected_return_date)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        if let Some(next) = next_status {
            tracing::info!(%routing_id, from = %current.status, to = %next, "Routing status changed");
        }
        Ok(routing)
    }

    /// Delete a routing that was never inspected
    pub async fn delete(&self, routing_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;
        lock_routing(&mut tx, routing_id).await?;

        let conferences = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM conferences WHERE routing_id = $1",
        )
        .bind(routing_id)
        .fetch_one(&mut *tx)
        .await?;
        if conferences > 0 {
            return Err(DomainError::RoutingHasConferences(routing_id).into());
        }

        sqlx::query("DELETE FROM routings WHERE id = $1")
            .bind(routing_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(%routing_id, "Routing deleted");
        Ok(())
    }
}

async fn lock_routing(conn: &mut PgConnection, routing_id: Uuid) -> AppResult<Routing> {
    let routing = sqlx::query_as::<_, Routing>(&format!(
        "SELECT {} FROM routings WHERE id = $1 FOR UPDATE",
        ROUTING_COLUMNS
    ))
    .bind(routing_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(DomainError::RoutingNotFound(routing_id))?;
    Ok(routing)
}

/// Planned to in production, without touching stock
async fn start_production(conn: &mut PgConnection, batch_id: Uuid) -> AppResult<()> {
    BatchStatus::Planned.ensure_transition(BatchStatus::InProduction)?;
    sqlx::query("UPDATE production_batches SET status = $2, updated_at = NOW() WHERE id = $1")
        .bind(batch_id)
        .bind(BatchStatus::InProduction)
        .execute(&mut *conn)
        .await?;
    tracing::info!(%batch_id, "Batch moved to production by its first routing");
    Ok(())
}
