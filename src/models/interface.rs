use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::utils::normalize_mac;

pub type InterfaceId = i64;

/// Name given to placeholder interfaces created from lease traffic
pub const UNKNOWN_INTERFACE_NAME: &str = "eth0";

/// Link-layer address, always stored lowercase colon-separated
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress(String);

impl MacAddress {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for MacAddress {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        normalize_mac(s)
            .map(MacAddress)
            .ok_or_else(|| anyhow::anyhow!("invalid MAC address: {}", s))
    }
}

impl TryFrom<String> for MacAddress {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MacAddress> for String {
    fn from(mac: MacAddress) -> Self {
        mac.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical interface kind values as stored
pub mod interface_kind {
    pub const PHYSICAL: &str = "physical";
    pub const BOND: &str = "bond";
    pub const UNKNOWN: &str = "unknown";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnownInterfaceKind {
    Physical,
    Bond,
}

impl KnownInterfaceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            KnownInterfaceKind::Physical => interface_kind::PHYSICAL,
            KnownInterfaceKind::Bond => interface_kind::BOND,
        }
    }
}

/// KnownInterface is a modeled NIC or bond belonging to a managed node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnownInterface {
    pub id: InterfaceId,
    pub node_id: String,
    pub name: String,
    pub kind: KnownInterfaceKind,
    pub mac: MacAddress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vlan_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<InterfaceId>,
}

/// UnknownInterface is a placeholder for hardware seen on the wire but not yet modeled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnknownInterface {
    pub id: InterfaceId,
    pub name: String,
    pub mac: MacAddress,
    pub vlan_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Interface identity a discovered address can be attached to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Interface {
    Known(KnownInterface),
    Unknown(UnknownInterface),
}

impl Interface {
    pub fn id(&self) -> InterfaceId {
        match self {
            Interface::Known(i) => i.id,
            Interface::Unknown(i) => i.id,
        }
    }

    pub fn mac(&self) -> &MacAddress {
        match self {
            Interface::Known(i) => &i.mac,
            Interface::Unknown(i) => &i.mac,
        }
    }

    pub fn vlan_id(&self) -> Option<i64> {
        match self {
            Interface::Known(i) => i.vlan_id,
            Interface::Unknown(i) => Some(i.vlan_id),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Interface::Known(i) => &i.name,
            Interface::Unknown(i) => &i.name,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Interface::Unknown(_))
    }
}

/// CreateInterfaceRequest registers a known interface on a node
#[derive(Debug, Clone, Deserialize)]
pub struct CreateInterfaceRequest {
    pub node_id: String,
    pub name: String,
    pub kind: KnownInterfaceKind,
    pub mac: MacAddress,
    #[serde(default)]
    pub vlan_id: Option<i64>,
    #[serde(default)]
    pub parents: Vec<InterfaceId>,
}
