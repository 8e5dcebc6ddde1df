use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Pool, Sqlite};

use crate::models::*;

use super::row_helpers::map_origin_row;

/// Origin database operations
pub struct OriginRepo;

impl OriginRepo {
    pub async fn get(pool: &Pool<Sqlite>, id: &str) -> Result<Option<Origin>> {
        let row = sqlx::query("SELECT id, name, created_at FROM origins WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(row.as_ref().map(map_origin_row))
    }

    /// Register an origin; re-registering only refreshes its name
    pub async fn create(pool: &Pool<Sqlite>, id: &str, name: &str) -> Result<Origin> {
        sqlx::query(
            r#"
            INSERT INTO origins (id, name, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET name = excluded.name
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(Utc::now())
        .execute(pool)
        .await?;

        Self::get(pool, id)
            .await?
            .context("Origin not found after creation")
    }
}
