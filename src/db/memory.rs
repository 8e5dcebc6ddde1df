//! In-process backend implementing every catalog seam. Used by embedders that
//! keep topology in memory and by the processor tests.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;

use crate::catalog::{InterfaceCatalog, LeaseRecordStore, OriginDirectory, SubnetCatalog};
use crate::models::*;

#[derive(Default)]
struct State {
    origins: HashMap<String, Origin>,
    subnets: BTreeMap<i64, Subnet>,
    interfaces: BTreeMap<InterfaceId, Interface>,
    records: HashMap<(InterfaceId, IpFamily), DiscoveredAddress>,
    next_subnet_id: i64,
    next_interface_id: InterfaceId,
    next_record_id: i64,
}

/// MemoryStore keeps all state behind one lock; every trait call is a single
/// critical section, which makes placeholder creation and record fan-out atomic.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create_origin(&self, id: &str, name: &str) -> Origin {
        let mut state = self.state.write();
        let origin = state.origins.entry(id.to_string()).or_insert_with(|| Origin {
            id: id.to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
        });
        origin.name = name.to_string();
        origin.clone()
    }

    /// Register a subnet; an existing CIDR is returned unchanged
    pub async fn create_subnet(&self, req: CreateSubnetRequest) -> Subnet {
        let mut state = self.state.write();
        let cidr = req.cidr.trunc();
        if let Some(existing) = state.subnets.values().find(|s| s.cidr == cidr) {
            return existing.clone();
        }
        state.next_subnet_id += 1;
        let subnet = Subnet {
            id: state.next_subnet_id,
            cidr,
            vlan_id: req.vlan_id,
            managed: req.managed,
        };
        state.subnets.insert(subnet.id, subnet.clone());
        subnet
    }

    pub async fn create_interface(&self, req: CreateInterfaceRequest) -> Interface {
        let mut state = self.state.write();
        state.next_interface_id += 1;
        let interface = Interface::Known(KnownInterface {
            id: state.next_interface_id,
            node_id: req.node_id,
            name: req.name,
            kind: req.kind,
            mac: req.mac,
            vlan_id: req.vlan_id,
            parents: req.parents,
        });
        state.interfaces.insert(interface.id(), interface.clone());
        interface
    }

    pub async fn unknown_interfaces(&self) -> Vec<Interface> {
        self.state
            .read()
            .interfaces
            .values()
            .filter(|i| i.is_unknown())
            .cloned()
            .collect()
    }

    /// Every discovered address, oldest first
    pub async fn all_records(&self) -> Vec<DiscoveredAddress> {
        let mut records: Vec<_> = self.state.read().records.values().cloned().collect();
        records.sort_by_key(|r| r.id);
        records
    }

    pub async fn find_record(&self, interface_id: InterfaceId, family: IpFamily) -> Option<DiscoveredAddress> {
        self.state.read().records.get(&(interface_id, family)).cloned()
    }
}

impl State {
    fn collect_records(&self, interfaces: &[InterfaceId], family: IpFamily) -> Vec<DiscoveredAddress> {
        interfaces
            .iter()
            .filter_map(|id| self.records.get(&(*id, family)).cloned())
            .collect()
    }

    /// The placeholder for `mac`, and whether it was just created
    fn placeholder(&mut self, mac: &MacAddress, vlan_id: i64) -> (Interface, bool) {
        if let Some(existing) = self
            .interfaces
            .values()
            .find(|i| i.is_unknown() && i.mac() == mac)
        {
            return (existing.clone(), false);
        }

        self.next_interface_id += 1;
        let interface = Interface::Unknown(UnknownInterface {
            id: self.next_interface_id,
            name: UNKNOWN_INTERFACE_NAME.to_string(),
            mac: mac.clone(),
            vlan_id,
            created_at: Utc::now(),
        });
        self.interfaces.insert(interface.id(), interface.clone());
        (interface, true)
    }

    fn upsert_records(&mut self, interfaces: &[InterfaceId], lease: &DiscoveredLease) {
        for interface_id in interfaces {
            let key = (*interface_id, lease.family);
            match self.records.get_mut(&key) {
                Some(record) => {
                    record.ip = Some(lease.ip);
                    record.subnet_id = lease.subnet_id;
                    record.lease_time = Some(lease.lease_time);
                    record.hostname = lease.hostname.clone();
                    record.updated_at = lease.observed_at;
                }
                None => {
                    self.next_record_id += 1;
                    let record = DiscoveredAddress {
                        id: self.next_record_id,
                        interface_id: *interface_id,
                        family: lease.family,
                        ip: Some(lease.ip),
                        subnet_id: lease.subnet_id,
                        lease_time: Some(lease.lease_time),
                        hostname: lease.hostname.clone(),
                        created_at: lease.observed_at,
                        updated_at: lease.observed_at,
                    };
                    self.records.insert(key, record);
                }
            }
        }
    }
}

#[async_trait]
impl OriginDirectory for MemoryStore {
    async fn lookup_origin(&self, origin_id: &str) -> Result<Option<Origin>> {
        Ok(self.state.read().origins.get(origin_id).cloned())
    }
}

#[async_trait]
impl SubnetCatalog for MemoryStore {
    async fn subnets_containing(&self, ip: IpAddr) -> Result<Vec<Subnet>> {
        Ok(self
            .state
            .read()
            .subnets
            .values()
            .filter(|s| s.contains(&ip))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl InterfaceCatalog for MemoryStore {
    async fn find_by_mac(&self, mac: &MacAddress) -> Result<Vec<Interface>> {
        Ok(self
            .state
            .read()
            .interfaces
            .values()
            .filter(|i| i.mac() == mac)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl LeaseRecordStore for MemoryStore {
    async fn upsert(&self, interfaces: &[InterfaceId], lease: &DiscoveredLease) -> Result<Vec<DiscoveredAddress>> {
        let mut state = self.state.write();
        state.upsert_records(interfaces, lease);
        Ok(state.collect_records(interfaces, lease.family))
    }

    async fn upsert_placeholder(
        &self,
        mac: &MacAddress,
        vlan_id: i64,
        lease: &DiscoveredLease,
    ) -> Result<(Interface, Vec<DiscoveredAddress>)> {
        let mut state = self.state.write();
        let (interface, created) = state.placeholder(mac, vlan_id);
        let ids = [interface.id()];
        state.upsert_records(&ids, lease);
        if created {
            tracing::info!("Created unknown interface for {} on vlan {}", mac, vlan_id);
        }
        Ok((interface, state.collect_records(&ids, lease.family)))
    }

    async fn clear_address(&self, interfaces: &[InterfaceId], clear: &LeaseClear) -> Result<Vec<DiscoveredAddress>> {
        let mut state = self.state.write();
        for interface_id in interfaces {
            let key = (*interface_id, clear.family);
            match state.records.get_mut(&key) {
                Some(record) => {
                    record.ip = None;
                    record.updated_at = clear.observed_at;
                }
                None => {
                    state.next_record_id += 1;
                    let record = DiscoveredAddress {
                        id: state.next_record_id,
                        interface_id: *interface_id,
                        family: clear.family,
                        ip: None,
                        subnet_id: clear.subnet_id,
                        lease_time: None,
                        hostname: None,
                        created_at: clear.observed_at,
                        updated_at: clear.observed_at,
                    };
                    state.records.insert(key, record);
                }
            }
        }
        Ok(state.collect_records(interfaces, clear.family))
    }

    async fn find(&self, interfaces: &[InterfaceId], family: IpFamily) -> Result<Vec<DiscoveredAddress>> {
        Ok(self.state.read().collect_records(interfaces, family))
    }
}
