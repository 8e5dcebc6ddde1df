//! Collaborator seams the lease processor depends on. Hosts plug in their own
//! storage by implementing these; `db::Store` (SQLite) and `db::MemoryStore`
//! are the bundled implementations.

use anyhow::Result;
use async_trait::async_trait;
use std::net::IpAddr;

use crate::models::*;

/// Registered observers allowed to report leases
#[async_trait]
pub trait OriginDirectory: Send + Sync {
    async fn lookup_origin(&self, origin_id: &str) -> Result<Option<Origin>>;
}

/// CIDR-indexed subnet lookup
#[async_trait]
pub trait SubnetCatalog: Send + Sync {
    /// Every subnet whose CIDR contains `ip`, with managed ranges populated.
    /// Order is unspecified; the resolver picks the most specific.
    async fn subnets_containing(&self, ip: IpAddr) -> Result<Vec<Subnet>>;
}

/// Node/interface catalog
#[async_trait]
pub trait InterfaceCatalog: Send + Sync {
    /// All interfaces sharing `mac`, known and placeholder alike
    async fn find_by_mac(&self, mac: &MacAddress) -> Result<Vec<Interface>>;
}

/// Durable (interface, family) -> discovered address mapping
#[async_trait]
pub trait LeaseRecordStore: Send + Sync {
    /// Create or overwrite the record of each interface for `lease.family`.
    /// Applied atomically across the whole set.
    async fn upsert(&self, interfaces: &[InterfaceId], lease: &DiscoveredLease) -> Result<Vec<DiscoveredAddress>>;

    /// Look up or create the placeholder interface for `mac` on `vlan_id` and
    /// upsert its record, all in one atomic step. Concurrent callers for the
    /// same MAC share one placeholder; if the write fails neither persists.
    async fn upsert_placeholder(
        &self,
        mac: &MacAddress,
        vlan_id: i64,
        lease: &DiscoveredLease,
    ) -> Result<(Interface, Vec<DiscoveredAddress>)>;

    /// Null out the address of each interface's record for `clear.family`,
    /// creating a subnet-linked record where none exists. Atomic across the set.
    async fn clear_address(&self, interfaces: &[InterfaceId], clear: &LeaseClear) -> Result<Vec<DiscoveredAddress>>;

    async fn find(&self, interfaces: &[InterfaceId], family: IpFamily) -> Result<Vec<DiscoveredAddress>>;
}

/// Convenience bound for a single backend serving every seam
pub trait LeaseBackend: OriginDirectory + SubnetCatalog + InterfaceCatalog + LeaseRecordStore {}

impl<T> LeaseBackend for T where T: OriginDirectory + SubnetCatalog + InterfaceCatalog + LeaseRecordStore {}
