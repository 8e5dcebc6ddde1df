use chrono::{DateTime, Utc};
use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use super::lease::IpFamily;

/// Origin is a registered network observer (rack/cluster controller) that reports leases
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Origin {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Inclusive address range, both ends in the same family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpRange {
    pub start: IpAddr,
    pub end: IpAddr,
}

impl IpRange {
    pub fn new(start: IpAddr, end: IpAddr) -> anyhow::Result<Self> {
        if IpFamily::of(&start) != IpFamily::of(&end) {
            anyhow::bail!("range {} - {} mixes address families", start, end);
        }
        if start > end {
            anyhow::bail!("range start {} is after end {}", start, end);
        }
        Ok(Self { start, end })
    }

    /// Parse a pair of address literals
    pub fn parse(start: &str, end: &str) -> anyhow::Result<Self> {
        let start: IpAddr = start.trim().parse()?;
        let end: IpAddr = end.trim().parse()?;
        Self::new(start, end)
    }

    pub fn contains(&self, ip: &IpAddr) -> bool {
        IpFamily::of(ip) == IpFamily::of(&self.start) && *ip >= self.start && *ip <= self.end
    }
}

/// ManagedInterface is an origin's DHCP-serving interface on a subnet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagedInterface {
    pub origin_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic_range: Option<IpRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_range: Option<IpRange>,
}

/// Subnet is an address block on a VLAN; its family follows the CIDR and never changes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subnet {
    pub id: i64,
    pub cidr: IpNet,
    pub vlan_id: i64,
    #[serde(default)]
    pub managed: Vec<ManagedInterface>,
}

impl Subnet {
    pub fn family(&self) -> IpFamily {
        match self.cidr {
            IpNet::V4(_) => IpFamily::Ipv4,
            IpNet::V6(_) => IpFamily::Ipv6,
        }
    }

    pub fn contains(&self, ip: &IpAddr) -> bool {
        self.cidr.contains(ip)
    }
}

/// CreateSubnetRequest for registering subnets in a catalog
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSubnetRequest {
    pub cidr: IpNet,
    pub vlan_id: i64,
    #[serde(default)]
    pub managed: Vec<ManagedInterface>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_contains() {
        let range = IpRange::parse("10.0.0.100", "10.0.0.200").unwrap();
        assert!(range.contains(&"10.0.0.100".parse().unwrap()));
        assert!(range.contains(&"10.0.0.150".parse().unwrap()));
        assert!(range.contains(&"10.0.0.200".parse().unwrap()));
        assert!(!range.contains(&"10.0.0.99".parse().unwrap()));
        assert!(!range.contains(&"10.0.0.201".parse().unwrap()));
        assert!(!range.contains(&"::ffff:10.0.0.150".parse().unwrap()));
    }

    #[test]
    fn test_range_rejects_bad_bounds() {
        assert!(IpRange::parse("10.0.0.200", "10.0.0.100").is_err());
        assert!(IpRange::parse("10.0.0.1", "fd00::1").is_err());
        assert!(IpRange::parse("10.0.0", "10.0.0.1").is_err());
    }

    #[test]
    fn test_subnet_family_follows_cidr() {
        let v4 = Subnet { id: 1, cidr: "10.0.0.0/24".parse().unwrap(), vlan_id: 5000, managed: vec![] };
        let v6 = Subnet { id: 2, cidr: "fd00::/64".parse().unwrap(), vlan_id: 5000, managed: vec![] };
        assert_eq!(v4.family(), IpFamily::Ipv4);
        assert_eq!(v6.family(), IpFamily::Ipv6);
        assert!(v4.contains(&"10.0.0.7".parse().unwrap()));
        assert!(!v4.contains(&"10.0.1.7".parse().unwrap()));
    }
}
