use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use crate::db::tag_queries;
use crate::models::{Holding, HoldingRecord};

// Holdings joined with their tag names, sorted, as a TEXT[].
const SELECT_HOLDINGS: &str =
    "SELECT h.id, h.symbol, h.quantity, h.cost_basis, h.closed, h.closing_price,
            h.created_at, h.updated_at,
            COALESCE(
                array_agg(t.name ORDER BY t.name) FILTER (WHERE t.name IS NOT NULL),
                '{}'::TEXT[]
            ) AS tags
     FROM holdings h
     LEFT JOIN holding_tags ht ON ht.holding_id = h.id
     LEFT JOIN tags t ON t.id = ht.tag_id";

pub async fn fetch_all(pool: &PgPool) -> Result<Vec<Holding>, sqlx::Error> {
    sqlx::query_as::<_, Holding>(&format!(
        "{SELECT_HOLDINGS} GROUP BY h.id ORDER BY h.created_at ASC, h.id ASC"
    ))
        .fetch_all(pool)
        .await
}

pub async fn fetch_one(pool: &PgPool, id: Uuid) -> Result<Option<Holding>, sqlx::Error> {
    sqlx::query_as::<_, Holding>(&format!("{SELECT_HOLDINGS} WHERE h.id = $1 GROUP BY h.id"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn insert(pool: &PgPool, record: &HoldingRecord) -> Result<Uuid, sqlx::Error> {
    let id = Uuid::new_v4();
    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO holdings (id, symbol, quantity, cost_basis, closed, closing_price)
         VALUES ($1, $2, $3, $4, $5, $6)"
    )
        .bind(id)
        .bind(&record.symbol)
        .bind(&record.quantity)
        .bind(&record.cost_basis)
        .bind(record.closed)
        .bind(&record.closing_price)
        .execute(&mut *tx)
        .await?;

    link_tags(&mut *tx, id, &record.tags).await?;

    tx.commit().await?;
    Ok(id)
}

/// Replaces every field and the full tag set. Returns false if no such holding.
pub async fn update(pool: &PgPool, id: Uuid, record: &HoldingRecord) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "UPDATE holdings
         SET symbol = $2, quantity = $3, cost_basis = $4, closed = $5, closing_price = $6,
             updated_at = now()
         WHERE id = $1"
    )
        .bind(id)
        .bind(&record.symbol)
        .bind(&record.quantity)
        .bind(&record.cost_basis)
        .bind(record.closed)
        .bind(&record.closing_price)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        tx.rollback().await?;
        return Ok(false);
    }

    sqlx::query("DELETE FROM holding_tags WHERE holding_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    link_tags(&mut *tx, id, &record.tags).await?;

    tx.commit().await?;
    Ok(true)
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM holdings WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

async fn link_tags(conn: &mut PgConnection, holding_id: Uuid, names: &[String]) -> Result<(), sqlx::Error> {
    for name in names {
        let tag_id = tag_queries::upsert_by_name(&mut *conn, name).await?;
        sqlx::query(
            "INSERT INTO holding_tags (holding_id, tag_id)
             VALUES ($1, $2)
             ON CONFLICT DO NOTHING"
        )
            .bind(holding_id)
            .bind(tag_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}
