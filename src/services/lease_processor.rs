use chrono::{DateTime, Utc};
use serde::Serialize;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::Instrument;

use crate::catalog::{InterfaceCatalog, LeaseBackend, LeaseRecordStore, OriginDirectory, SubnetCatalog};
use crate::error::LeaseError;
use crate::models::*;
use crate::utils;

use super::family;
use super::interface_resolver::{InterfaceResolver, InterfaceSet};
use super::key_locks::KeyedLocks;
use super::subnet_resolver::{dynamic_range_admits, SubnetResolver};

/// What an accepted lease event did
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LeaseOutcome {
    /// Address recorded on every interface carrying the MAC
    Committed {
        interfaces: Vec<Interface>,
        records: Vec<DiscoveredAddress>,
    },
    /// Address cleared, subnet linkage kept
    Cleared {
        interfaces: Vec<Interface>,
        records: Vec<DiscoveredAddress>,
    },
    /// Commit for an address the origin does not lease dynamically
    OutsideDynamicRange,
    /// Release/expiry for a MAC that was never seen
    UnknownInterface,
}

impl LeaseOutcome {
    pub fn is_noop(&self) -> bool {
        matches!(self, LeaseOutcome::OutsideDynamicRange | LeaseOutcome::UnknownInterface)
    }
}

/// Validated form of a LeaseEvent
struct CheckedEvent {
    action: LeaseAction,
    mac: MacAddress,
    ip: IpAddr,
    asserted: IpFamily,
    observed_at: DateTime<Utc>,
    lease_time: Option<u32>,
    hostname: Option<String>,
}

/// LeaseProcessor reconciles lease events into discovered address records.
/// Each event is independent; events for the same (MAC, family) are
/// serialized, other keys proceed in parallel.
pub struct LeaseProcessor {
    origins: Arc<dyn OriginDirectory>,
    subnets: SubnetResolver,
    interfaces: InterfaceResolver,
    records: Arc<dyn LeaseRecordStore>,
    locks: KeyedLocks<(MacAddress, IpFamily)>,
}

impl LeaseProcessor {
    pub fn new(
        origins: Arc<dyn OriginDirectory>,
        subnets: Arc<dyn SubnetCatalog>,
        interfaces: Arc<dyn InterfaceCatalog>,
        records: Arc<dyn LeaseRecordStore>,
    ) -> Self {
        Self {
            origins,
            subnets: SubnetResolver::new(subnets),
            interfaces: InterfaceResolver::new(interfaces),
            records,
            locks: KeyedLocks::new(),
        }
    }

    /// Build a processor whose collaborators are all one backend
    pub fn with_backend<B: LeaseBackend + 'static>(backend: Arc<B>) -> Self {
        Self::new(backend.clone(), backend.clone(), backend.clone(), backend)
    }

    /// Apply one lease event. Errors leave durable records untouched.
    pub async fn submit_lease_event(&self, event: &LeaseEvent) -> Result<LeaseOutcome, LeaseError> {
        let span = tracing::info_span!(
            "lease_event",
            id = %uuid::Uuid::new_v4(),
            origin = %event.origin_id,
            action = %event.action,
            mac = %event.mac,
            ip = %event.ip,
        );
        self.process(event).instrument(span).await
    }

    async fn process(&self, event: &LeaseEvent) -> Result<LeaseOutcome, LeaseError> {
        self.origins
            .lookup_origin(&event.origin_id)
            .await?
            .ok_or_else(|| LeaseError::NoSuchOrigin(event.origin_id.clone()))?;

        let checked = check_event(event)?;

        let subnet = self.subnets.resolve(checked.ip).await?;
        let family = family::confirm_family(checked.asserted, subnet.family())?;

        let _guard = self.locks.lock(&(checked.mac.clone(), family)).await;

        if checked.action.clears_address() {
            self.clear(&subnet, family, checked).await
        } else {
            self.commit(&subnet, family, checked).await
        }
    }

    async fn commit(&self, subnet: &Subnet, family: IpFamily, event: CheckedEvent) -> Result<LeaseOutcome, LeaseError> {
        if !dynamic_range_admits(subnet, &event.ip) {
            tracing::debug!("{} is outside the dynamic range of {}, ignoring", event.ip, subnet.cidr);
            return Ok(LeaseOutcome::OutsideDynamicRange);
        }

        let lease_time = event
            .lease_time
            .ok_or_else(|| LeaseError::MalformedEvent("lease time is required for commit".to_string()))?;

        let lease = DiscoveredLease {
            family,
            ip: event.ip,
            subnet_id: subnet.id,
            lease_time,
            hostname: event.hostname,
            observed_at: event.observed_at,
        };
        let (interfaces, records) = match self.interfaces.resolve(&event.mac, subnet).await? {
            InterfaceSet::Known(interfaces) => {
                let ids: Vec<InterfaceId> = interfaces.iter().map(Interface::id).collect();
                let records = self.records.upsert(&ids, &lease).await?;
                (interfaces, records)
            }
            InterfaceSet::Unseen { mac, vlan_id } => {
                let (placeholder, records) = self.records.upsert_placeholder(&mac, vlan_id, &lease).await?;
                tracing::info!("Using unknown interface {} for {} on vlan {}", placeholder.id(), mac, vlan_id);
                (vec![placeholder], records)
            }
        };

        tracing::info!(
            "Committed {} for {} on {} interface(s) in {}",
            event.ip,
            event.mac,
            interfaces.len(),
            subnet.cidr
        );
        Ok(LeaseOutcome::Committed { interfaces, records })
    }

    async fn clear(&self, subnet: &Subnet, family: IpFamily, event: CheckedEvent) -> Result<LeaseOutcome, LeaseError> {
        let interfaces = self.interfaces.existing(&event.mac).await?;
        if interfaces.is_empty() {
            tracing::debug!("{} for unseen {}, nothing to do", event.action, event.mac);
            return Ok(LeaseOutcome::UnknownInterface);
        }

        let ids: Vec<InterfaceId> = interfaces.iter().map(Interface::id).collect();
        let clear = LeaseClear {
            family,
            subnet_id: subnet.id,
            observed_at: event.observed_at,
        };
        let records = self.records.clear_address(&ids, &clear).await?;

        tracing::info!(
            "Cleared {} address for {} on {} interface(s) ({})",
            family,
            event.mac,
            ids.len(),
            event.action
        );
        Ok(LeaseOutcome::Cleared { interfaces, records })
    }
}

/// Syntactic validation; nothing here touches a collaborator
fn check_event(event: &LeaseEvent) -> Result<CheckedEvent, LeaseError> {
    let action: LeaseAction = event.action.parse()?;
    let mac: MacAddress = event
        .mac
        .parse()
        .map_err(|e: anyhow::Error| LeaseError::MalformedEvent(e.to_string()))?;
    let (ip, _) = family::classify(&event.ip)?;
    let asserted = family::asserted_family(&event.ip_family)?;
    let observed_at = utils::timestamp_to_utc(event.timestamp)
        .ok_or_else(|| LeaseError::MalformedEvent(format!("timestamp out of range: {}", event.timestamp)))?;

    Ok(CheckedEvent {
        action,
        mac,
        ip,
        asserted,
        observed_at,
        lease_time: event.lease_time,
        hostname: normalize_hostname(event.hostname.clone()),
    })
}
