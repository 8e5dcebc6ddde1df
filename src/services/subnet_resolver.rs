use std::net::IpAddr;
use std::sync::Arc;

use crate::catalog::SubnetCatalog;
use crate::error::LeaseError;
use crate::models::Subnet;

/// SubnetResolver finds the owning subnet of an address
#[derive(Clone)]
pub struct SubnetResolver {
    catalog: Arc<dyn SubnetCatalog>,
}

impl SubnetResolver {
    pub fn new(catalog: Arc<dyn SubnetCatalog>) -> Self {
        Self { catalog }
    }

    /// Most specific subnet containing `ip`, or NoSubnetFound
    pub async fn resolve(&self, ip: IpAddr) -> Result<Subnet, LeaseError> {
        let candidates = self.catalog.subnets_containing(ip).await?;
        most_specific(candidates, &ip).ok_or(LeaseError::NoSubnetFound(ip))
    }
}

/// Longest-prefix match. Ties (same CIDR registered twice) go to the lowest id.
pub fn most_specific(candidates: Vec<Subnet>, ip: &IpAddr) -> Option<Subnet> {
    candidates
        .into_iter()
        .filter(|s| s.contains(ip))
        .max_by(|a, b| {
            a.cidr
                .prefix_len()
                .cmp(&b.cidr.prefix_len())
                .then_with(|| b.id.cmp(&a.id))
        })
}

/// Whether a commit for `ip` falls in a dynamic range served on the subnet.
/// Dynamic ranges of every managed interface count, whichever origin serves
/// them. A subnet with no managed interface imposes no range filter.
pub fn dynamic_range_admits(subnet: &Subnet, ip: &IpAddr) -> bool {
    if subnet.managed.is_empty() {
        return true;
    }
    subnet
        .managed
        .iter()
        .any(|m| m.dynamic_range.map_or(false, |r| r.contains(ip)))
}
