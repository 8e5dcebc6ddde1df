use anyhow::{Context, Result};
use sqlx::{Row, sqlite::SqliteRow};
use std::net::IpAddr;

use crate::models::*;

/// Filter empty strings to None; some columns store '' instead of NULL
pub fn none_if_empty(opt: Option<String>) -> Option<String> {
    opt.filter(|s| !s.is_empty())
}

/// Parse a comma-separated id list ("3,4") as stored in interfaces.parents
pub fn csv_to_i64_vec(csv: &str) -> Vec<i64> {
    csv.split(',')
        .filter_map(|s| s.trim().parse::<i64>().ok())
        .collect()
}

pub fn i64_vec_to_csv(ids: &[i64]) -> String {
    ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(",")
}

fn parse_family(raw: &str) -> Result<IpFamily> {
    IpFamily::from_label(raw).with_context(|| format!("unexpected family in database: {}", raw))
}

fn parse_range(start: Option<String>, end: Option<String>) -> Result<Option<IpRange>> {
    match (none_if_empty(start), none_if_empty(end)) {
        (Some(start), Some(end)) => Ok(Some(IpRange::parse(&start, &end)?)),
        _ => Ok(None),
    }
}

/// Map a SQLite row to an Origin struct
pub fn map_origin_row(row: &SqliteRow) -> Origin {
    Origin {
        id: row.get("id"),
        name: row.get("name"),
        created_at: row.get("created_at"),
    }
}

/// Map a SQLite row to a Subnet struct (managed interfaces loaded separately)
pub fn map_subnet_row(row: &SqliteRow) -> Result<Subnet> {
    let cidr: String = row.get("cidr");
    Ok(Subnet {
        id: row.get("id"),
        cidr: cidr.parse().with_context(|| format!("invalid CIDR in database: {}", cidr))?,
        vlan_id: row.get("vlan_id"),
        managed: Vec::new(),
    })
}

/// Map a SQLite row to a ManagedInterface struct
pub fn map_managed_interface_row(row: &SqliteRow) -> Result<ManagedInterface> {
    Ok(ManagedInterface {
        origin_id: row.get("origin_id"),
        name: row.get("name"),
        dynamic_range: parse_range(row.get("dynamic_start"), row.get("dynamic_end"))?,
        static_range: parse_range(row.get("static_start"), row.get("static_end"))?,
    })
}

/// Map a SQLite row to either interface variant based on its kind column
pub fn map_interface_row(row: &SqliteRow) -> Result<Interface> {
    let kind: String = row.get("kind");
    let mac: String = row.get("mac");
    let mac: MacAddress = mac.parse()?;

    let interface = match kind.as_str() {
        interface_kind::UNKNOWN => Interface::Unknown(UnknownInterface {
            id: row.get("id"),
            name: row.get("name"),
            mac,
            vlan_id: row
                .get::<Option<i64>, _>("vlan_id")
                .context("unknown interface without vlan")?,
            created_at: row.get("created_at"),
        }),
        interface_kind::PHYSICAL | interface_kind::BOND => Interface::Known(KnownInterface {
            id: row.get("id"),
            node_id: none_if_empty(row.get("node_id")).unwrap_or_default(),
            name: row.get("name"),
            kind: if kind == interface_kind::BOND {
                KnownInterfaceKind::Bond
            } else {
                KnownInterfaceKind::Physical
            },
            mac,
            vlan_id: row.get("vlan_id"),
            parents: csv_to_i64_vec(&row.get::<String, _>("parents")),
        }),
        other => anyhow::bail!("unexpected interface kind in database: {}", other),
    };
    Ok(interface)
}

/// Map a SQLite row to a DiscoveredAddress struct
pub fn map_discovered_address_row(row: &SqliteRow) -> Result<DiscoveredAddress> {
    let ip: Option<IpAddr> = match none_if_empty(row.get("ip")) {
        Some(raw) => Some(raw.parse().with_context(|| format!("invalid IP in database: {}", raw))?),
        None => None,
    };
    let lease_time: Option<i64> = row.get("lease_time");
    Ok(DiscoveredAddress {
        id: row.get("id"),
        interface_id: row.get("interface_id"),
        family: parse_family(&row.get::<String, _>("family"))?,
        ip,
        subnet_id: row.get("subnet_id"),
        lease_time: lease_time.and_then(|t| u32::try_from(t).ok()),
        hostname: none_if_empty(row.get("hostname")),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_ids() {
        assert_eq!(csv_to_i64_vec(""), Vec::<i64>::new());
        assert_eq!(csv_to_i64_vec("3, 4,x"), vec![3, 4]);
        assert_eq!(i64_vec_to_csv(&[3, 4]), "3,4");
        assert_eq!(i64_vec_to_csv(&[]), "");
    }
}
