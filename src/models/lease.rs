use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use crate::error::LeaseError;

/// Hostname placeholder reported by DHCP servers for clients that sent none
pub const NO_HOSTNAME: &str = "(none)";

/// Address family of an IP literal or subnet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpFamily {
    Ipv4,
    Ipv6,
}

impl IpFamily {
    pub fn of(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => IpFamily::Ipv4,
            IpAddr::V6(_) => IpFamily::Ipv6,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IpFamily::Ipv4 => "ipv4",
            IpFamily::Ipv6 => "ipv6",
        }
    }

    /// Parse a reporter family label ("ipv4" / "ipv6", case-insensitive)
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "ipv4" => Some(IpFamily::Ipv4),
            "ipv6" => Some(IpFamily::Ipv6),
            _ => None,
        }
    }
}

impl fmt::Display for IpFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical lease action values
pub mod lease_action {
    pub const COMMIT: &str = "commit";
    pub const RELEASE: &str = "release";
    pub const EXPIRY: &str = "expiry";
}

/// Lifecycle step reported for a lease
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaseAction {
    Commit,
    Release,
    Expiry,
}

impl LeaseAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaseAction::Commit => lease_action::COMMIT,
            LeaseAction::Release => lease_action::RELEASE,
            LeaseAction::Expiry => lease_action::EXPIRY,
        }
    }

    /// Release and expiry share the same effect on discovered records
    pub fn clears_address(&self) -> bool {
        matches!(self, LeaseAction::Release | LeaseAction::Expiry)
    }
}

impl FromStr for LeaseAction {
    type Err = LeaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            lease_action::COMMIT => Ok(LeaseAction::Commit),
            lease_action::RELEASE => Ok(LeaseAction::Release),
            lease_action::EXPIRY => Ok(LeaseAction::Expiry),
            other => Err(LeaseError::UnknownLeaseAction(other.to_string())),
        }
    }
}

impl fmt::Display for LeaseAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// LeaseEvent is one lease lifecycle notification as reported by an origin.
/// Fields stay close to the wire form; the processor validates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaseEvent {
    #[serde(alias = "cluster_uuid")]
    pub origin_id: String,
    pub action: String,
    #[serde(alias = "mac_address")]
    pub mac: String,
    pub ip: String,
    pub ip_family: String,
    /// Seconds since epoch, authoritative event time
    pub timestamp: i64,
    #[serde(default)]
    pub lease_time: Option<u32>,
    #[serde(default, deserialize_with = "deserialize_hostname")]
    pub hostname: Option<String>,
}

impl LeaseEvent {
    /// Build a commit event
    pub fn commit(
        origin_id: impl Into<String>,
        mac: impl Into<String>,
        ip: IpAddr,
        timestamp: i64,
        lease_time: u32,
        hostname: Option<&str>,
    ) -> Self {
        Self {
            origin_id: origin_id.into(),
            action: lease_action::COMMIT.to_string(),
            mac: mac.into(),
            ip: ip.to_string(),
            ip_family: IpFamily::of(&ip).to_string(),
            timestamp,
            lease_time: Some(lease_time),
            hostname: normalize_hostname(hostname.map(str::to_string)),
        }
    }

    /// Build a release or expiry event (or any other action string)
    pub fn with_action(
        origin_id: impl Into<String>,
        action: impl Into<String>,
        mac: impl Into<String>,
        ip: IpAddr,
        timestamp: i64,
    ) -> Self {
        Self {
            origin_id: origin_id.into(),
            action: action.into(),
            mac: mac.into(),
            ip: ip.to_string(),
            ip_family: IpFamily::of(&ip).to_string(),
            timestamp,
            lease_time: None,
            hostname: None,
        }
    }
}

/// Strip whitespace and map the "(none)" placeholder or an empty string to None
pub fn normalize_hostname(hostname: Option<String>) -> Option<String> {
    hostname
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty() && h != NO_HOSTNAME)
}

fn deserialize_hostname<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(normalize_hostname(raw))
}
