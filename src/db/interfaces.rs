use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Pool, Sqlite, SqliteConnection};

use crate::models::*;

use super::row_helpers::{i64_vec_to_csv, map_interface_row};

const SELECT_INTERFACE: &str = r#"
    SELECT id, kind, node_id, name, mac, vlan_id, parents, created_at
    FROM interfaces
"#;

/// Known and placeholder interface database operations
pub struct InterfaceRepo;

impl InterfaceRepo {
    pub async fn get(pool: &Pool<Sqlite>, id: InterfaceId) -> Result<Option<Interface>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_INTERFACE))
            .bind(id)
            .fetch_optional(pool)
            .await?;

        row.as_ref().map(map_interface_row).transpose()
    }

    pub async fn list_by_mac(pool: &Pool<Sqlite>, mac: &MacAddress) -> Result<Vec<Interface>> {
        let rows = sqlx::query(&format!("{} WHERE mac = ? ORDER BY id", SELECT_INTERFACE))
            .bind(mac.as_str())
            .fetch_all(pool)
            .await?;

        rows.iter().map(map_interface_row).collect()
    }

    pub async fn list_unknown(pool: &Pool<Sqlite>) -> Result<Vec<Interface>> {
        let rows = sqlx::query(&format!(
            "{} WHERE kind = '{}' ORDER BY id",
            SELECT_INTERFACE,
            interface_kind::UNKNOWN
        ))
        .fetch_all(pool)
        .await?;

        rows.iter().map(map_interface_row).collect()
    }

    pub async fn find_known(pool: &Pool<Sqlite>, node_id: &str, name: &str) -> Result<Option<Interface>> {
        let row = sqlx::query(&format!(
            "{} WHERE node_id = ? AND name = ? AND kind != '{}'",
            SELECT_INTERFACE,
            interface_kind::UNKNOWN
        ))
        .bind(node_id)
        .bind(name)
        .fetch_optional(pool)
        .await?;

        row.as_ref().map(map_interface_row).transpose()
    }

    pub async fn create_known(pool: &Pool<Sqlite>, req: &CreateInterfaceRequest) -> Result<Interface> {
        let result = sqlx::query(
            r#"
            INSERT INTO interfaces (kind, node_id, name, mac, vlan_id, parents, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(req.kind.as_str())
        .bind(&req.node_id)
        .bind(&req.name)
        .bind(req.mac.as_str())
        .bind(req.vlan_id)
        .bind(i64_vec_to_csv(&req.parents))
        .bind(Utc::now())
        .execute(pool)
        .await?;

        Self::get(pool, result.last_insert_rowid())
            .await?
            .context("Interface not found after creation")
    }

    /// Insert the placeholder unless one already exists for this MAC, then read
    /// it back. The partial unique index on (mac) for unknown rows makes the
    /// insert a no-op for every caller but the first. Runs on the caller's
    /// connection so it joins the caller's transaction; the flag reports
    /// whether the row is new.
    pub async fn get_or_create_unknown(
        conn: &mut SqliteConnection,
        mac: &MacAddress,
        vlan_id: i64,
    ) -> Result<(Interface, bool)> {
        let result = sqlx::query(
            r#"
            INSERT INTO interfaces (kind, node_id, name, mac, vlan_id, parents, created_at)
            VALUES (?, NULL, ?, ?, ?, '', ?)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(interface_kind::UNKNOWN)
        .bind(UNKNOWN_INTERFACE_NAME)
        .bind(mac.as_str())
        .bind(vlan_id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        let row = sqlx::query(&format!("{} WHERE mac = ? AND kind = ?", SELECT_INTERFACE))
            .bind(mac.as_str())
            .bind(interface_kind::UNKNOWN)
            .fetch_optional(&mut *conn)
            .await?
            .with_context(|| format!("Unknown interface for {} not found after creation", mac))?;

        Ok((map_interface_row(&row)?, result.rows_affected() > 0))
    }
}
