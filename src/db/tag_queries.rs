use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use crate::models::Tag;

pub async fn fetch_all(pool: &PgPool) -> Result<Vec<Tag>, sqlx::Error> {
    sqlx::query_as::<_, Tag>(
        "SELECT id, name, created_at, updated_at
         FROM tags
         ORDER BY name ASC"
    )
        .fetch_all(pool)
        .await
}

pub async fn fetch_one(pool: &PgPool, id: Uuid) -> Result<Option<Tag>, sqlx::Error> {
    sqlx::query_as::<_, Tag>(
        "SELECT id, name, created_at, updated_at
         FROM tags
         WHERE id = $1"
    )
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn insert(pool: &PgPool, tag: Tag) -> Result<Tag, sqlx::Error> {
    sqlx::query_as::<_, Tag>(
        "INSERT INTO tags (id, name, created_at, updated_at)
         VALUES ($1, $2, $3, $4)
         RETURNING id, name, created_at, updated_at"
    )
        .bind(tag.id)
        .bind(tag.name)
        .bind(tag.created_at)
        .bind(tag.updated_at)
        .fetch_one(pool)
        .await
}

pub async fn rename(pool: &PgPool, id: Uuid, name: &str) -> Result<Option<Tag>, sqlx::Error> {
    sqlx::query_as::<_, Tag>(
        "UPDATE tags
         SET name = $2, updated_at = now()
         WHERE id = $1
         RETURNING id, name, created_at, updated_at"
    )
        .bind(id)
        .bind(name)
        .fetch_optional(pool)
        .await
}

/// holding_tags rows go with it (ON DELETE CASCADE).
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM tags WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Returns the id of the tag with this name, creating it if needed.
pub async fn upsert_by_name(conn: &mut PgConnection, name: &str) -> Result<Uuid, sqlx::Error> {
    let (id,): (Uuid,) = sqlx::query_as(
        "INSERT INTO tags (id, name)
         VALUES ($1, $2)
         ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
         RETURNING id"
    )
        .bind(Uuid::new_v4())
        .bind(name)
        .fetch_one(conn)
        .await?;
    Ok(id)
}
