use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use super::interface::InterfaceId;
use super::lease::IpFamily;

/// DiscoveredAddress is the reconciled evidence of an interface's leased address.
/// At most one exists per (interface_id, family). `ip` is None once the lease
/// is released or expired; the subnet link is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredAddress {
    pub id: i64,
    pub interface_id: InterfaceId,
    pub family: IpFamily,
    pub ip: Option<IpAddr>,
    pub subnet_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lease_time: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DiscoveredAddress {
    pub fn is_active(&self) -> bool {
        self.ip.is_some()
    }
}

/// DiscoveredLease carries the content written by a commit
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredLease {
    pub family: IpFamily,
    pub ip: IpAddr,
    pub subnet_id: i64,
    pub lease_time: u32,
    pub hostname: Option<String>,
    /// Event time, used as updated_at (and created_at for new records)
    pub observed_at: DateTime<Utc>,
}

/// LeaseClear carries a release/expiry for one family
#[derive(Debug, Clone, PartialEq)]
pub struct LeaseClear {
    pub family: IpFamily,
    /// Subnet to link when the interface has no record in this family yet
    pub subnet_id: i64,
    pub observed_at: DateTime<Utc>,
}
