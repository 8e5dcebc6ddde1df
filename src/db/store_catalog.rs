use anyhow::Result;
use async_trait::async_trait;
use std::net::IpAddr;

use crate::catalog::{InterfaceCatalog, LeaseRecordStore, OriginDirectory, SubnetCatalog};
use crate::models::*;

use super::discovered::DiscoveredAddressRepo;
use super::interfaces::InterfaceRepo;
use super::origins::OriginRepo;
use super::subnets::SubnetRepo;
use super::Store;

#[async_trait]
impl OriginDirectory for Store {
    async fn lookup_origin(&self, origin_id: &str) -> Result<Option<Origin>> {
        OriginRepo::get(&self.pool, origin_id).await
    }
}

#[async_trait]
impl SubnetCatalog for Store {
    async fn subnets_containing(&self, ip: IpAddr) -> Result<Vec<Subnet>> {
        SubnetRepo::list_containing(&self.pool, ip).await
    }
}

#[async_trait]
impl InterfaceCatalog for Store {
    async fn find_by_mac(&self, mac: &MacAddress) -> Result<Vec<Interface>> {
        InterfaceRepo::list_by_mac(&self.pool, mac).await
    }
}

#[async_trait]
impl LeaseRecordStore for Store {
    async fn upsert(&self, interfaces: &[InterfaceId], lease: &DiscoveredLease) -> Result<Vec<DiscoveredAddress>> {
        DiscoveredAddressRepo::upsert(&self.pool, interfaces, lease).await
    }

    async fn upsert_placeholder(
        &self,
        mac: &MacAddress,
        vlan_id: i64,
        lease: &DiscoveredLease,
    ) -> Result<(Interface, Vec<DiscoveredAddress>)> {
        DiscoveredAddressRepo::upsert_placeholder(&self.pool, mac, vlan_id, lease).await
    }

    async fn clear_address(&self, interfaces: &[InterfaceId], clear: &LeaseClear) -> Result<Vec<DiscoveredAddress>> {
        DiscoveredAddressRepo::clear_address(&self.pool, interfaces, clear).await
    }

    async fn find(&self, interfaces: &[InterfaceId], family: IpFamily) -> Result<Vec<DiscoveredAddress>> {
        DiscoveredAddressRepo::find(&self.pool, interfaces, family).await
    }
}
