use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Pool, Sqlite};
use std::net::IpAddr;

use crate::models::*;

use super::row_helpers::{map_managed_interface_row, map_subnet_row};

const SELECT_SUBNET: &str = r#"
    SELECT id, cidr, family, vlan_id, created_at
    FROM subnets
"#;

/// Subnet and managed range database operations
pub struct SubnetRepo;

impl SubnetRepo {
    pub async fn list(pool: &Pool<Sqlite>) -> Result<Vec<Subnet>> {
        let rows = sqlx::query(&format!("{} ORDER BY id", SELECT_SUBNET))
            .fetch_all(pool)
            .await?;

        let mut subnets = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut subnet = map_subnet_row(row)?;
            subnet.managed = Self::list_managed(pool, subnet.id).await?;
            subnets.push(subnet);
        }
        Ok(subnets)
    }

    pub async fn get(pool: &Pool<Sqlite>, id: i64) -> Result<Option<Subnet>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_SUBNET))
            .bind(id)
            .fetch_optional(pool)
            .await?;

        match row {
            Some(row) => {
                let mut subnet = map_subnet_row(&row)?;
                subnet.managed = Self::list_managed(pool, subnet.id).await?;
                Ok(Some(subnet))
            }
            None => Ok(None),
        }
    }

    pub async fn get_by_cidr(pool: &Pool<Sqlite>, cidr: &str) -> Result<Option<Subnet>> {
        let row = sqlx::query(&format!("{} WHERE cidr = ?", SELECT_SUBNET))
            .bind(cidr)
            .fetch_optional(pool)
            .await?;

        match row {
            Some(row) => Self::get(pool, map_subnet_row(&row)?.id).await,
            None => Ok(None),
        }
    }

    /// Subnets of the address's family whose CIDR contains it.
    /// Containment is evaluated here since SQLite has no inet type.
    pub async fn list_containing(pool: &Pool<Sqlite>, ip: IpAddr) -> Result<Vec<Subnet>> {
        let family = IpFamily::of(&ip);
        let rows = sqlx::query(&format!("{} WHERE family = ? ORDER BY id", SELECT_SUBNET))
            .bind(family.as_str())
            .fetch_all(pool)
            .await?;

        let mut subnets = Vec::new();
        for row in &rows {
            let mut subnet = map_subnet_row(row)?;
            if !subnet.contains(&ip) {
                continue;
            }
            subnet.managed = Self::list_managed(pool, subnet.id).await?;
            subnets.push(subnet);
        }
        Ok(subnets)
    }

    async fn list_managed(pool: &Pool<Sqlite>, subnet_id: i64) -> Result<Vec<ManagedInterface>> {
        let rows = sqlx::query(
            r#"
            SELECT origin_id, name, dynamic_start, dynamic_end, static_start, static_end
            FROM managed_interfaces
            WHERE subnet_id = ?
            ORDER BY id
            "#,
        )
        .bind(subnet_id)
        .fetch_all(pool)
        .await?;

        rows.iter().map(map_managed_interface_row).collect()
    }

    /// Create a subnet with its managed interfaces in one transaction.
    /// An existing CIDR is returned unchanged.
    pub async fn create(pool: &Pool<Sqlite>, req: &CreateSubnetRequest) -> Result<Subnet> {
        let cidr = req.cidr.trunc().to_string();
        if let Some(existing) = Self::get_by_cidr(pool, &cidr).await? {
            return Ok(existing);
        }

        let family = match req.cidr {
            ipnet::IpNet::V4(_) => IpFamily::Ipv4,
            ipnet::IpNet::V6(_) => IpFamily::Ipv6,
        };

        let mut tx = pool.begin().await?;
        let result = sqlx::query(
            "INSERT INTO subnets (cidr, family, vlan_id, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&cidr)
        .bind(family.as_str())
        .bind(req.vlan_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
        let subnet_id = result.last_insert_rowid();

        for managed in &req.managed {
            for range in [managed.dynamic_range, managed.static_range].iter().flatten() {
                if !req.cidr.contains(&range.start) || !req.cidr.contains(&range.end) {
                    anyhow::bail!("range {} - {} is outside subnet {}", range.start, range.end, cidr);
                }
            }
            sqlx::query(
                r#"
                INSERT INTO managed_interfaces (subnet_id, origin_id, name,
                    dynamic_start, dynamic_end, static_start, static_end)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(subnet_id)
            .bind(&managed.origin_id)
            .bind(&managed.name)
            .bind(managed.dynamic_range.map(|r| r.start.to_string()))
            .bind(managed.dynamic_range.map(|r| r.end.to_string()))
            .bind(managed.static_range.map(|r| r.start.to_string()))
            .bind(managed.static_range.map(|r| r.end.to_string()))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Self::get(pool, subnet_id)
            .await?
            .context("Subnet not found after creation")
    }
}
