use std::sync::Arc;

use lease_reconciler::catalog::{InterfaceCatalog, LeaseRecordStore, SubnetCatalog};
use lease_reconciler::db::Store;
use lease_reconciler::models::*;
use lease_reconciler::{LeaseError, LeaseOutcome, LeaseProcessor};
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

const ORIGIN: &str = "c1";
const MAC: &str = "aa:bb:cc:dd:ee:01";
const TS: i64 = 1_700_000_000;

struct Fixture {
    _dir: TempDir,
    store: Arc<Store>,
    processor: LeaseProcessor,
    v4: Subnet,
    v6: Subnet,
}

async fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("leases.db");
    let store = Arc::new(Store::new(path.to_str().unwrap()).await.unwrap());

    store.create_origin(ORIGIN, "rack-1").await.unwrap();
    let v4 = store
        .create_subnet(&CreateSubnetRequest {
            cidr: "10.0.0.0/24".parse().unwrap(),
            vlan_id: 5001,
            managed: vec![ManagedInterface {
                origin_id: ORIGIN.into(),
                name: "eth1".into(),
                dynamic_range: Some(IpRange::parse("10.0.0.100", "10.0.0.200").unwrap()),
                static_range: Some(IpRange::parse("10.0.0.10", "10.0.0.99").unwrap()),
            }],
        })
        .await
        .unwrap();
    let v6 = store
        .create_subnet(&CreateSubnetRequest {
            cidr: "fd00::/64".parse().unwrap(),
            vlan_id: 5001,
            managed: vec![],
        })
        .await
        .unwrap();

    let processor = LeaseProcessor::with_backend(store.clone());
    Fixture { _dir: dir, store, processor, v4, v6 }
}

fn commit(ip: &str) -> LeaseEvent {
    LeaseEvent::commit(ORIGIN, MAC, ip.parse().unwrap(), TS, 600, Some("node1"))
}

#[tokio::test]
async fn test_subnet_round_trips_managed_ranges() {
    let f = fixture().await;
    let found = f.store.subnets_containing("10.0.0.150".parse().unwrap()).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0], f.v4);
    assert_eq!(found[0].managed[0].dynamic_range, Some(IpRange::parse("10.0.0.100", "10.0.0.200").unwrap()));
    assert!(f.store.subnets_containing("192.168.1.1".parse().unwrap()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_nested_subnets_pick_longest_prefix() {
    let f = fixture().await;
    let narrow = f
        .store
        .create_subnet(&CreateSubnetRequest {
            cidr: "10.0.0.128/25".parse().unwrap(),
            vlan_id: 5002,
            managed: vec![],
        })
        .await
        .unwrap();

    assert_ok!(f.processor.submit_lease_event(&commit("10.0.0.150")).await);
    let records = f.store.list_discovered_addresses().await.unwrap();
    assert_eq!(records[0].subnet_id, narrow.id);
    assert_eq!(f.store.list_unknown_interfaces().await.unwrap()[0].vlan_id(), Some(5002));
}

#[tokio::test]
async fn test_commit_then_release_keeps_linkage() {
    let f = fixture().await;
    assert_ok!(f.processor.submit_lease_event(&commit("10.0.0.150")).await);

    let unknown = f.store.list_unknown_interfaces().await.unwrap();
    assert_eq!(unknown.len(), 1);
    assert_eq!(unknown[0].name(), UNKNOWN_INTERFACE_NAME);
    assert_eq!(unknown[0].vlan_id(), Some(5001));

    let release = LeaseEvent::with_action(ORIGIN, "release", MAC, "10.0.0.150".parse().unwrap(), TS + 5);
    let outcome = f.processor.submit_lease_event(&release).await.unwrap();
    assert!(matches!(outcome, LeaseOutcome::Cleared { .. }));

    let records = f.store.list_discovered_addresses().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].ip, None);
    assert_eq!(records[0].subnet_id, f.v4.id);
    assert_eq!(records[0].lease_time, Some(600));
    assert_eq!(records[0].hostname.as_deref(), Some("node1"));
    assert_eq!(records[0].created_at.timestamp(), TS);
    assert_eq!(records[0].updated_at.timestamp(), TS + 5);
}

#[tokio::test]
async fn test_outside_dynamic_range_writes_nothing() {
    let f = fixture().await;
    let outcome = f.processor.submit_lease_event(&commit("10.0.0.50")).await.unwrap();
    assert!(outcome.is_noop());
    assert!(f.store.list_discovered_addresses().await.unwrap().is_empty());
    assert!(f.store.list_unknown_interfaces().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_fan_out_to_bond_and_physical() {
    let f = fixture().await;
    let eth0 = f
        .store
        .create_interface(&CreateInterfaceRequest {
            node_id: "node-1".into(),
            name: "eth0".into(),
            kind: KnownInterfaceKind::Physical,
            mac: MAC.parse().unwrap(),
            vlan_id: Some(5001),
            parents: vec![],
        })
        .await
        .unwrap();
    let bond = f
        .store
        .create_interface(&CreateInterfaceRequest {
            node_id: "node-1".into(),
            name: "bond0".into(),
            kind: KnownInterfaceKind::Bond,
            mac: MAC.parse().unwrap(),
            vlan_id: Some(5001),
            parents: vec![eth0.id()],
        })
        .await
        .unwrap();

    assert_ok!(f.processor.submit_lease_event(&commit("10.0.0.150")).await);

    let records = f.store.list_discovered_addresses().await.unwrap();
    let mut ids: Vec<_> = records.iter().map(|r| r.interface_id).collect();
    ids.sort();
    assert_eq!(ids, vec![eth0.id(), bond.id()]);
    assert!(records.iter().all(|r| r.ip == Some("10.0.0.150".parse().unwrap())));
    assert!(f.store.list_unknown_interfaces().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_families_are_independent() {
    let f = fixture().await;
    assert_ok!(f.processor.submit_lease_event(&commit("10.0.0.150")).await);
    assert_ok!(f.processor.submit_lease_event(&commit("fd00::1500")).await);

    let expiry = LeaseEvent::with_action(ORIGIN, "expiry", MAC, "fd00::1500".parse().unwrap(), TS + 60);
    assert_ok!(f.processor.submit_lease_event(&expiry).await);

    let records = f.store.list_discovered_addresses().await.unwrap();
    assert_eq!(records.len(), 2);
    let v4 = records.iter().find(|r| r.family == IpFamily::Ipv4).unwrap();
    let v6 = records.iter().find(|r| r.family == IpFamily::Ipv6).unwrap();
    assert_eq!(v4.ip, Some("10.0.0.150".parse().unwrap()));
    assert_eq!(v6.ip, None);
    assert_eq!(v6.subnet_id, f.v6.id);
    assert_eq!(f.store.list_unknown_interfaces().await.unwrap().len(), 1);

    let on_v4 = f.store.list_discovered_addresses_by_subnet(f.v4.id).await.unwrap();
    let on_v6 = f.store.list_discovered_addresses_by_subnet(f.v6.id).await.unwrap();
    assert_eq!(on_v4, vec![v4.clone()]);
    assert_eq!(on_v6, vec![v6.clone()]);
}

#[tokio::test]
async fn test_rejections_leave_store_untouched() {
    let f = fixture().await;

    let mut stranger = commit("10.0.0.150");
    stranger.origin_id = "nope".into();
    let err = assert_err!(f.processor.submit_lease_event(&stranger).await);
    assert_eq!(err.to_string(), "No such origin: nope");

    let err = assert_err!(f.processor.submit_lease_event(&commit("192.168.9.9")).await);
    assert_eq!(err.to_string(), "No subnet exists for: 192.168.9.9");

    let mut mismatch = commit("10.0.0.150");
    mismatch.ip_family = "ipv6".into();
    let err = assert_err!(f.processor.submit_lease_event(&mismatch).await);
    assert!(matches!(err, LeaseError::FamilyMismatch { .. }));

    assert!(f.store.list_discovered_addresses().await.unwrap().is_empty());
    assert!(f.store.list_unknown_interfaces().await.unwrap().is_empty());
}

fn lease(family: IpFamily, ip: &str, subnet_id: i64) -> DiscoveredLease {
    DiscoveredLease {
        family,
        ip: ip.parse().unwrap(),
        subnet_id,
        lease_time: 600,
        hostname: None,
        observed_at: lease_reconciler::utils::timestamp_to_utc(TS).unwrap(),
    }
}

#[tokio::test]
async fn test_placeholder_creation_is_unique_under_contention() {
    let f = fixture().await;
    let mac: MacAddress = MAC.parse().unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let store = f.store.clone();
        let mac = mac.clone();
        let lease = if i % 2 == 0 {
            lease(IpFamily::Ipv4, "10.0.0.150", f.v4.id)
        } else {
            lease(IpFamily::Ipv6, "fd00::1500", f.v6.id)
        };
        handles.push(tokio::spawn(async move { store.upsert_placeholder(&mac, 5001, &lease).await }));
    }
    let mut ids = Vec::new();
    for handle in handles {
        let (interface, records) = handle.await.unwrap().unwrap();
        assert_eq!(records.len(), 1);
        ids.push(interface.id());
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);
    assert_eq!(f.store.find_by_mac(&mac).await.unwrap().len(), 1);
    assert_eq!(f.store.list_discovered_addresses().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_failed_placeholder_write_rolls_back() {
    let f = fixture().await;
    let mac: MacAddress = MAC.parse().unwrap();

    assert_err!(f.store.upsert_placeholder(&mac, 5001, &lease(IpFamily::Ipv4, "10.0.0.150", 9999)).await);
    assert!(f.store.list_unknown_interfaces().await.unwrap().is_empty());
    assert!(f.store.list_discovered_addresses().await.unwrap().is_empty());

    let (interface, records) = f
        .store
        .upsert_placeholder(&mac, 5001, &lease(IpFamily::Ipv4, "10.0.0.150", f.v4.id))
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(f.store.find(&[interface.id()], IpFamily::Ipv4).await.unwrap(), records);
    assert!(f.store.find(&[interface.id()], IpFamily::Ipv6).await.unwrap().is_empty());
}
