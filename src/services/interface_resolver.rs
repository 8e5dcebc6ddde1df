use anyhow::Result;
use std::sync::Arc;

use crate::catalog::InterfaceCatalog;
use crate::models::*;

/// Interfaces a lease event applies to
#[derive(Debug, Clone, PartialEq)]
pub enum InterfaceSet {
    /// Every interface already carrying the MAC
    Known(Vec<Interface>),
    /// MAC never seen; its placeholder on `vlan_id` is created together with
    /// the first record so a failed write leaves nothing behind
    Unseen { mac: MacAddress, vlan_id: i64 },
}

/// InterfaceResolver maps a MAC address to the interfaces carrying it
#[derive(Clone)]
pub struct InterfaceResolver {
    catalog: Arc<dyn InterfaceCatalog>,
}

impl InterfaceResolver {
    pub fn new(catalog: Arc<dyn InterfaceCatalog>) -> Self {
        Self { catalog }
    }

    /// Interfaces already on record for `mac`; never creates anything
    pub async fn existing(&self, mac: &MacAddress) -> Result<Vec<Interface>> {
        self.catalog.find_by_mac(mac).await
    }

    /// Interfaces for `mac`, or the placeholder to create on the subnet's VLAN
    /// when the MAC has never been seen.
    pub async fn resolve(&self, mac: &MacAddress, subnet: &Subnet) -> Result<InterfaceSet> {
        let interfaces = self.catalog.find_by_mac(mac).await?;
        if interfaces.is_empty() {
            return Ok(InterfaceSet::Unseen {
                mac: mac.clone(),
                vlan_id: subnet.vlan_id,
            });
        }
        Ok(InterfaceSet::Known(interfaces))
    }
}
