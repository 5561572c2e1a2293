//! Read lookups against reference data owned by the back-office CRUD

use shared::validation::missing_ids;
use shared::{DomainError, Faction};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::AppResult;

async fn exists(conn: &mut PgConnection, table: &str, id: Uuid) -> AppResult<bool> {
    let found = sqlx::query_scalar::<_, bool>(&format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)",
        table
    ))
    .bind(id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(found)
}

async fn missing(conn: &mut PgConnection, table: &str, ids: &[Uuid]) -> AppResult<Vec<Uuid>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let found = sqlx::query_scalar::<_, Uuid>(&format!(
        "SELECT id FROM {} WHERE id = ANY($1)",
        table
    ))
    .bind(ids)
    .fetch_all(&mut *conn)
    .await?;
    Ok(missing_ids(ids, &found))
}

pub async fn ensure_user(conn: &mut PgConnection, user_id: Uuid) -> AppResult<()> {
    if !exists(conn, "users", user_id).await? {
        return Err(DomainError::UserNotFound(user_id).into());
    }
    Ok(())
}

pub async fn ensure_fabric(conn: &mut PgConnection, fabric_id: Uuid) -> AppResult<()> {
    if !exists(conn, "fabrics", fabric_id).await? {
        return Err(DomainError::FabricNotFound(fabric_id).into());
    }
    Ok(())
}

/// Fails listing every missing product, not just the first
pub async fn ensure_products(conn: &mut PgConnection, ids: &[Uuid]) -> AppResult<()> {
    let missing = missing(conn, "products", ids).await?;
    if !missing.is_empty() {
        return Err(DomainError::ProductNotFound(missing).into());
    }
    Ok(())
}

pub async fn ensure_sizes(conn: &mut PgConnection, ids: &[Uuid]) -> AppResult<()> {
    let missing = missing(conn, "sizes", ids).await?;
    if !missing.is_empty() {
        return Err(DomainError::SizeNotFound(missing).into());
    }
    Ok(())
}

pub async fn faction(conn: &mut PgConnection, faction_id: Uuid) -> AppResult<Faction> {
    let faction = sqlx::query_as::<_, Faction>("SELECT id, name, status FROM factions WHERE id = $1")
        .bind(faction_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(DomainError::FactionNotFound(faction_id))?;
    Ok(faction)
}
