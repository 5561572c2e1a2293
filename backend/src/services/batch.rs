//! Production batch lifecycle service
//!
//! Every mutation runs in one transaction. Reserving fabric for a batch
//! takes the weight out of the roll immediately through an exit movement;
//! there is no separate soft hold.

use serde::Deserialize;
use shared::models::{normalize_spreads, referenced_products_and_sizes, spread_reservations};
use shared::reservation::{accumulate_reservations, ReservationRequest, ValidatedReservations};
use shared::validation::{validate_batch_code, validate_consumption, validate_spreads};
use shared::{
    BatchStatus, ConsumptionInput, DomainError, PaginatedResponse, Pagination, ProductionBatch,
    ReservationInput, RollReservation, RollStatus, SpreadInput,
};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::batch_response::{
    shape_batch, BatchResponse, BatchRows, FabricRow, ItemRow, ReservedRollRow, ResponsibleRow,
    RoutingSummary, SpreadRow,
};
use crate::services::{lookup, reservation};

pub(crate) const BATCH_COLUMNS: &str =
    "id, code, fabric_id, responsible_id, status, note, created_at, updated_at";

/// Batch lifecycle service
#[derive(Clone)]
pub struct BatchService {
    db: PgPool,
}

/// Input for creating a batch
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBatchInput {
    #[validate(length(min = 1, max = 50))]
    pub code: String,
    pub responsible_id: Uuid,
    pub status: Option<BatchStatus>,
    #[validate(length(max = 500))]
    pub note: Option<String>,
    #[serde(default)]
    pub reservations: Vec<ReservationInput>,
    pub spreads: Option<Vec<SpreadInput>>,
}

/// Input for adding spreads to a batch
#[derive(Debug, Deserialize)]
pub struct AddItemsInput {
    pub spreads: Vec<SpreadInput>,
}

/// Input for updating a batch
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateBatchInput {
    #[validate(length(min = 1, max = 50))]
    pub code: Option<String>,
    pub responsible_id: Option<Uuid>,
    pub status: Option<BatchStatus>,
    #[validate(length(max = 500))]
    pub note: Option<String>,
    /// Rolls consumed when the batch starts production
    pub consumption: Option<Vec<ConsumptionInput>>,
    /// Overrides the token subject as the actor of consumption movements
    pub acting_user_id: Option<Uuid>,
}

/// Filters for listing batches
#[derive(Debug, Default, Deserialize)]
pub struct BatchFilter {
    pub status: Option<BatchStatus>,
    pub responsible_id: Option<Uuid>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl BatchService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a batch, consuming its reserved weight from each roll on behalf
    /// of the responsible user
    pub async fn create(&self, input: CreateBatchInput) -> AppResult<BatchResponse> {
        validate_batch_code(&input.code).map_err(|msg| AppError::validation("code", msg))?;
        if let Some(spreads) = &input.spreads {
            validate_spreads(spreads).map_err(|msg| AppError::validation("spreads", msg))?;
        }
        let code = input.code.trim().to_string();

        let mut tx = self.db.begin().await?;

        ensure_code_free(&mut tx, &code, None).await?;

        let requests: Vec<ReservationRequest> = input
            .reservations
            .iter()
            .map(|r| ReservationRequest {
                roll_id: r.roll_id,
                weight_kg: r.reserved_weight_kg,
                declared_color_id: r.color_id,
            })
            .collect();
        let validated = reservation::validate(&mut tx, &requests).await?;
        let fabric_id = validated.single_fabric()?;

        lookup::ensure_user(&mut tx, input.responsible_id).await?;

        let status = match input.status {
            Some(requested) => BatchStatus::Planned
                .ensure_transition(requested)?
                .unwrap_or(BatchStatus::Planned),
            None => BatchStatus::Planned,
        };

        let batch = sqlx::query_as::<_, ProductionBatch>(&format!(
            r#"
            INSERT INTO production_batches (code, fabric_id, responsible_id, status, note)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            BATCH_COLUMNS
        ))
        .bind(&code)
        .bind(fabric_id)
        .bind(input.responsible_id)
        .bind(status)
        .bind(&input.note)
        .fetch_one(&mut *tx)
        .await?;

        reserve(&mut tx, batch.id, &validated, input.responsible_id).await?;

        if let Some(spreads) = &input.spreads {
            add_items_in_tx(&mut tx, &batch, spreads, input.responsible_id).await?;
        }

        tx.commit().await?;

        tracing::info!(
            batch_id = %batch.id,
            code = %batch.code,
            %fabric_id,
            rolls = validated.grouped.len(),
            "Batch created"
        );

        self.get(batch.id).await
    }

    /// Add spreads and their product/size lines to an open batch. Movements
    /// are recorded on behalf of `actor`, or the batch responsible when absent.
    pub async fn add_items(
        &self,
        batch_id: Uuid,
        input: AddItemsInput,
        actor: Option<Uuid>,
    ) -> AppResult<BatchResponse> {
        validate_spreads(&input.spreads).map_err(|msg| AppError::validation("spreads", msg))?;

        let mut tx = self.db.begin().await?;
        let batch = lock_batch(&mut tx, batch_id).await?;
        if batch.status.is_closed() {
            return Err(DomainError::BatchClosed {
                batch_id,
                status: batch.status.as_str().to_string(),
            }
            .into());
        }

        let user_id = actor.unwrap_or(batch.responsible_id);
        add_items_in_tx(&mut tx, &batch, &input.spreads, user_id).await?;

        tx.commit().await?;

        self.get(batch_id).await
    }

    /// Update fields and/or move the batch through its status table. A
    /// consumption list is only accepted when production starts.
    pub async fn update(
        &self,
        batch_id: Uuid,
        acting_user: Option<Uuid>,
        input: UpdateBatchInput,
    ) -> AppResult<BatchResponse> {
        if let Some(code) = &input.code {
            validate_batch_code(code).map_err(|msg| AppError::validation("code", msg))?;
        }
        if let Some(consumption) = &input.consumption {
            validate_consumption(consumption)
                .map_err(|msg| AppError::validation("consumption", msg))?;
        }

        let mut tx = self.db.begin().await?;
        let batch = lock_batch(&mut tx, batch_id).await?;

        let next_status = match input.status {
            Some(requested) => batch.status.ensure_transition(requested)?,
            None => None,
        };

        if let Some(consumption) = input.consumption.as_deref().filter(|c| !c.is_empty()) {
            let starts = next_status.is_some_and(|next| batch.status.starts_production(next));
            if !starts {
                return Err(DomainError::ConsumptionNotAllowed.into());
            }
            let actor = input
                .acting_user_id
                .or(acting_user)
                .ok_or(DomainError::ActorRequired)?;
            lookup::ensure_user(&mut tx, actor).await?;

            let requests: Vec<ReservationRequest> = consumption
                .iter()
                .map(|c| ReservationRequest {
                    roll_id: c.roll_id,
                    weight_kg: c.weight_kg,
                    declared_color_id: None,
                })
                .collect();
            let validated = reservation::validate(&mut tx, &requests).await?;
            validated.ensure_fabric(batch.fabric_id)?;
            reservation::consume(&mut tx, &validated, actor, RollStatus::InUse).await?;

            tracing::info!(%batch_id, %actor, rolls = validated.grouped.len(), "Rolls consumed at production start");
        }

        let code = input.code.as_deref().map(str::trim);
        if let Some(code) = code {
            if code != batch.code {
                ensure_code_free(&mut tx, code, Some(batch_id)).await?;
            }
        }
        if let Some(responsible_id) = input.responsible_id {
            lookup::ensure_user(&mut tx, responsible_id).await?;
        }

        sqlx::query(
            r#"
            UPDATE production_batches
            SET code = COALESCE($2, code),
                responsible_id = COALESCE($3, responsible_id),
                status = COALESCE($4, status),
                note = COALESCE($5, note),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(batch_id)
        .bind(code)
        .bind(input.responsible_id)
        .bind(next_status)
        .bind(&input.note)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        if let Some(next) = next_status {
            tracing::info!(%batch_id, from = %batch.status, to = %next, "Batch status changed");
        }

        self.get(batch_id).await
    }

    /// Delete a batch that was never routed. Consumed stock stays consumed.
    pub async fn delete(&self, batch_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;
        lock_batch(&mut tx, batch_id).await?;

        let routings = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM routings WHERE batch_id = $1")
            .bind(batch_id)
            .fetch_one(&mut *tx)
            .await?;
        if routings > 0 {
            return Err(DomainError::BatchHasRoutings(batch_id).into());
        }

        // spreads and spread_rolls cascade from items
        sqlx::query("DELETE FROM batch_items WHERE batch_id = $1")
            .bind(batch_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM batch_rolls WHERE batch_id = $1")
            .bind(batch_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM production_batches WHERE id = $1")
            .bind(batch_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(%batch_id, "Batch deleted");
        Ok(())
    }

    /// Get the shaped batch
    pub async fn get(&self, batch_id: Uuid) -> AppResult<BatchResponse> {
        let batch = sqlx::query_as::<_, ProductionBatch>(&format!(
            "SELECT {} FROM production_batches WHERE id = $1",
            BATCH_COLUMNS
        ))
        .bind(batch_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(DomainError::BatchNotFound(batch_id))?;

        Ok(shape_batch(self.load_rows(batch).await?))
    }

    /// List shaped batches, newest first
    pub async fn list(
        &self,
        filter: BatchFilter,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<BatchResponse>> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM production_batches
            WHERE ($1::batch_status IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR responsible_id = $2)
            "#,
        )
        .bind(filter.status)
        .bind(filter.responsible_id)
        .fetch_one(&self.db)
        .await?;

        let batches = sqlx::query_as::<_, ProductionBatch>(&format!(
            r#"
            SELECT {}
            FROM production_batches
            WHERE ($1::batch_status IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR responsible_id = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
            BATCH_COLUMNS
        ))
        .bind(filter.status)
        .bind(filter.responsible_id)
        .bind(pagination.limit_i64())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let mut data = Vec::with_capacity(batches.len());
        for batch in batches {
            data.push(shape_batch(self.load_rows(batch).await?));
        }

        Ok(PaginatedResponse::new(data, pagination, total))
    }

    async fn load_rows(&self, batch: ProductionBatch) -> AppResult<BatchRows> {
        let fabric = sqlx::query_as::<_, FabricRow>(
            r#"
            SELECT id, name, reference_code, yield_m_per_kg, width_m, grammage, price_per_kg
            FROM fabrics WHERE id = $1
            "#,
        )
        .bind(batch.fabric_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(DomainError::FabricNotFound(batch.fabric_id))?;

        let responsible = sqlx::query_as::<_, ResponsibleRow>(
            "SELECT id, name, role_sector FROM users WHERE id = $1",
        )
        .bind(batch.responsible_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(DomainError::UserNotFound(batch.responsible_id))?;

        let rolls = sqlx::query_as::<_, ReservedRollRow>(
            r#"
            SELECT r.id AS roll_id, r.barcode, r.current_weight_kg, r.status,
                   br.reserved_weight_kg, c.id AS color_id, c.name AS color_name,
                   c.hex_code AS color_hex
            FROM batch_rolls br
            JOIN fabric_rolls r ON r.id = br.roll_id
            JOIN fabrics f ON f.id = r.fabric_id
            JOIN colors c ON c.id = f.color_id
            WHERE br.batch_id = $1
            ORDER BY c.name, r.created_at
            "#,
        )
        .bind(batch.id)
        .fetch_all(&self.db)
        .await?;

        let items = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT i.id, i.product_id, i.size_id, i.quantity_per_unit, i.planned_quantity,
                   p.name AS product_name, p.sku, s.name AS size_name
            FROM batch_items i
            JOIN products p ON p.id = i.product_id
            JOIN sizes s ON s.id = i.size_id
            WHERE i.batch_id = $1
            ORDER BY i.created_at, p.name, s.name
            "#,
        )
        .bind(batch.id)
        .fetch_all(&self.db)
        .await?;

        let spreads = sqlx::query_as::<_, SpreadRow>(
            r#"
            SELECT sp.item_id, sp.group_id, sp.color_id, sp.sheet_count
            FROM spreads sp
            JOIN batch_items i ON i.id = sp.item_id
            WHERE i.batch_id = $1
            "#,
        )
        .bind(batch.id)
        .fetch_all(&self.db)
        .await?;

        let routings = sqlx::query_as::<_, RoutingSummary>(
            r#"
            SELECT id, faction_id, service_type, status, expected_return_date
            FROM routings
            WHERE batch_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(batch.id)
        .fetch_all(&self.db)
        .await?;

        Ok(BatchRows {
            batch,
            fabric,
            responsible,
            rolls,
            items,
            spreads,
            routings,
        })
    }
}

pub(crate) async fn lock_batch(conn: &mut PgConnection, batch_id: Uuid) -> AppResult<ProductionBatch> {
    let batch = sqlx::query_as::<_, ProductionBatch>(&format!(
        "SELECT {} FROM production_batches WHERE id = $1 FOR UPDATE",
        BATCH_COLUMNS
    ))
    .bind(batch_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(DomainError::BatchNotFound(batch_id))?;
    Ok(batch)
}

async fn ensure_code_free(conn: &mut PgConnection, code: &str, except: Option<Uuid>) -> AppResult<()> {
    let taken = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM production_batches WHERE code = $1 AND ($2::uuid IS NULL OR id <> $2))",
    )
    .bind(code)
    .bind(except)
    .fetch_one(&mut *conn)
    .await?;
    if taken {
        return Err(DomainError::DuplicateBatchCode(code.to_string()).into());
    }
    Ok(())
}

/// Exit every validated roll and accumulate its reservation on the batch
async fn reserve(
    conn: &mut PgConnection,
    batch_id: Uuid,
    validated: &ValidatedReservations,
    user_id: Uuid,
) -> AppResult<()> {
    reservation::consume(conn, validated, user_id, RollStatus::Available).await?;

    let roll_ids: Vec<Uuid> = validated.grouped.iter().map(|g| g.roll_id).collect();
    let held = sqlx::query_as::<_, RollReservation>(
        r#"
        SELECT batch_id, roll_id, reserved_weight_kg
        FROM batch_rolls
        WHERE batch_id = $1 AND roll_id = ANY($2)
        FOR UPDATE
        "#,
    )
    .bind(batch_id)
    .bind(&roll_ids)
    .fetch_all(&mut *conn)
    .await?;

    for row in accumulate_reservations(batch_id, &held, &validated.grouped) {
        sqlx::query(
            r#"
            INSERT INTO batch_rolls (batch_id, roll_id, reserved_weight_kg)
            VALUES ($1, $2, $3)
            ON CONFLICT (batch_id, roll_id)
            DO UPDATE SET reserved_weight_kg = EXCLUDED.reserved_weight_kg
            "#,
        )
        .bind(row.batch_id)
        .bind(row.roll_id)
        .bind(row.reserved_weight_kg)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn add_items_in_tx(
    conn: &mut PgConnection,
    batch: &ProductionBatch,
    spreads: &[SpreadInput],
    user_id: Uuid,
) -> AppResult<()> {
    let items = normalize_spreads(spreads)?;

    let (products, sizes) = referenced_products_and_sizes(&items);
    lookup::ensure_products(conn, &products).await?;
    lookup::ensure_sizes(conn, &sizes).await?;

    let validated = reservation::validate(conn, &spread_reservations(spreads)).await?;
    validated.ensure_fabric(batch.fabric_id)?;
    reserve(conn, batch.id, &validated, user_id).await?;

    let groups: Vec<Uuid> = spreads.iter().map(|_| Uuid::new_v4()).collect();

    for item in &items {
        let item_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO batch_items (batch_id, product_id, size_id, quantity_per_unit, planned_quantity)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(batch.id)
        .bind(item.product_id)
        .bind(item.size_id)
        .bind(item.quantity_per_unit)
        .bind(item.planned_quantity())
        .fetch_one(&mut *conn)
        .await?;

        for spread in &item.spreads {
            let group_id = groups[spread.group];
            let spread_id = sqlx::query_scalar::<_, Uuid>(
                r#"
                INSERT INTO spreads (item_id, group_id, color_id, sheet_count)
                VALUES ($1, $2, $3, $4)
                RETURNING id
                "#,
            )
            .bind(item_id)
            .bind(group_id)
            .bind(spread.color_id)
            .bind(spread.sheet_count)
            .fetch_one(&mut *conn)
            .await?;

            for roll in &spread.rolls {
                sqlx::query(
                    r#"
                    INSERT INTO spread_rolls (spread_id, roll_id, weight_kg)
                    VALUES ($1, $2, $3)
                    ON CONFLICT (spread_id, roll_id)
                    DO UPDATE SET weight_kg = spread_rolls.weight_kg + EXCLUDED.weight_kg
                    "#,
                )
                .bind(spread_id)
                .bind(roll.roll_id)
                .bind(shared::ledger::normalize_weight(roll.weight_kg))
                .execute(&mut *conn)
                .await?;
            }
        }
    }

    tracing::info!(
        batch_id = %batch.id,
        items = items.len(),
        spreads = spreads.len(),
        "Items added to batch"
    );
    Ok(())
}
