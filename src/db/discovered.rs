use anyhow::Result;
use sqlx::{Pool, Sqlite, SqliteConnection};

use crate::models::*;

use super::interfaces::InterfaceRepo;
use super::row_helpers::map_discovered_address_row;

const SELECT_DISCOVERED: &str = r#"
    SELECT id, interface_id, family, ip, subnet_id, lease_time, hostname, created_at, updated_at
    FROM discovered_addresses
"#;

/// Discovered address database operations.
/// Writes for one event run in a single transaction across its interfaces.
pub struct DiscoveredAddressRepo;

impl DiscoveredAddressRepo {
    pub async fn list(pool: &Pool<Sqlite>) -> Result<Vec<DiscoveredAddress>> {
        let rows = sqlx::query(&format!("{} ORDER BY id", SELECT_DISCOVERED))
            .fetch_all(pool)
            .await?;

        rows.iter().map(map_discovered_address_row).collect()
    }

    pub async fn list_by_subnet(pool: &Pool<Sqlite>, subnet_id: i64) -> Result<Vec<DiscoveredAddress>> {
        let rows = sqlx::query(&format!("{} WHERE subnet_id = ? ORDER BY id", SELECT_DISCOVERED))
            .bind(subnet_id)
            .fetch_all(pool)
            .await?;

        rows.iter().map(map_discovered_address_row).collect()
    }

    pub async fn find(pool: &Pool<Sqlite>, interfaces: &[InterfaceId], family: IpFamily) -> Result<Vec<DiscoveredAddress>> {
        let mut conn = pool.acquire().await?;
        Self::find_on(&mut *conn, interfaces, family).await
    }

    async fn find_on(
        conn: &mut SqliteConnection,
        interfaces: &[InterfaceId],
        family: IpFamily,
    ) -> Result<Vec<DiscoveredAddress>> {
        let mut records = Vec::with_capacity(interfaces.len());
        for interface_id in interfaces {
            let row = sqlx::query(&format!("{} WHERE interface_id = ? AND family = ?", SELECT_DISCOVERED))
                .bind(interface_id)
                .bind(family.as_str())
                .fetch_optional(&mut *conn)
                .await?;
            if let Some(row) = row {
                records.push(map_discovered_address_row(&row)?);
            }
        }
        Ok(records)
    }

    /// Create or overwrite the (interface, family) record of every interface.
    /// created_at is only written on insert.
    pub async fn upsert(pool: &Pool<Sqlite>, interfaces: &[InterfaceId], lease: &DiscoveredLease) -> Result<Vec<DiscoveredAddress>> {
        let mut tx = pool.begin().await?;
        Self::upsert_on(&mut *tx, interfaces, lease).await?;
        let records = Self::find_on(&mut *tx, interfaces, lease.family).await?;
        tx.commit().await?;
        Ok(records)
    }

    /// Create the placeholder for `mac` if needed and upsert its record in the
    /// same transaction; a failed write rolls both back.
    pub async fn upsert_placeholder(
        pool: &Pool<Sqlite>,
        mac: &MacAddress,
        vlan_id: i64,
        lease: &DiscoveredLease,
    ) -> Result<(Interface, Vec<DiscoveredAddress>)> {
        let mut tx = pool.begin().await?;
        let (interface, created) = InterfaceRepo::get_or_create_unknown(&mut *tx, mac, vlan_id).await?;
        let ids = [interface.id()];
        Self::upsert_on(&mut *tx, &ids, lease).await?;
        let records = Self::find_on(&mut *tx, &ids, lease.family).await?;
        tx.commit().await?;

        if created {
            tracing::info!("Created unknown interface for {} on vlan {}", mac, vlan_id);
        }
        Ok((interface, records))
    }

    async fn upsert_on(conn: &mut SqliteConnection, interfaces: &[InterfaceId], lease: &DiscoveredLease) -> Result<()> {
        for interface_id in interfaces {
            sqlx::query(
                r#"
                INSERT INTO discovered_addresses (interface_id, family, ip, subnet_id, lease_time,
                    hostname, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(interface_id, family) DO UPDATE SET
                    ip = excluded.ip,
                    subnet_id = excluded.subnet_id,
                    lease_time = excluded.lease_time,
                    hostname = excluded.hostname,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(interface_id)
            .bind(lease.family.as_str())
            .bind(lease.ip.to_string())
            .bind(lease.subnet_id)
            .bind(i64::from(lease.lease_time))
            .bind(lease.hostname.as_deref())
            .bind(lease.observed_at)
            .bind(lease.observed_at)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    /// Null the address of every interface's record in the family, keeping the
    /// subnet link. Interfaces without a record get one linked to `clear.subnet_id`.
    pub async fn clear_address(pool: &Pool<Sqlite>, interfaces: &[InterfaceId], clear: &LeaseClear) -> Result<Vec<DiscoveredAddress>> {
        let mut tx = pool.begin().await?;
        for interface_id in interfaces {
            sqlx::query(
                r#"
                INSERT INTO discovered_addresses (interface_id, family, ip, subnet_id, lease_time,
                    hostname, created_at, updated_at)
                VALUES (?, ?, NULL, ?, NULL, NULL, ?, ?)
                ON CONFLICT(interface_id, family) DO UPDATE SET
                    ip = NULL,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(interface_id)
            .bind(clear.family.as_str())
            .bind(clear.subnet_id)
            .bind(clear.observed_at)
            .bind(clear.observed_at)
            .execute(&mut *tx)
            .await?;
        }
        let records = Self::find_on(&mut *tx, interfaces, clear.family).await?;
        tx.commit().await?;
        Ok(records)
    }
}
