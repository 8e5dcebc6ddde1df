use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::models::*;

use super::Store;

/// Topology loaded from the JSON seed file at startup
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopologySeed {
    #[serde(default)]
    pub origins: Vec<OriginSeed>,
    #[serde(default)]
    pub subnets: Vec<CreateSubnetRequest>,
    #[serde(default)]
    pub interfaces: Vec<InterfaceSeed>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OriginSeed {
    pub id: String,
    pub name: String,
}

/// Known interface; `parents` name other interfaces of the same node,
/// which must appear earlier in the file.
#[derive(Debug, Clone, Deserialize)]
pub struct InterfaceSeed {
    pub node_id: String,
    pub name: String,
    pub kind: KnownInterfaceKind,
    pub mac: MacAddress,
    #[serde(default)]
    pub vlan_id: Option<i64>,
    #[serde(default)]
    pub parents: Vec<String>,
}

impl TopologySeed {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("Failed to parse topology seed")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read seed file {}", path.display()))?;
        Self::from_json(&raw)
    }
}

/// Counts of rows created by one seed run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub origins: usize,
    pub subnets: usize,
    pub interfaces: usize,
}

impl Store {
    /// Apply a topology seed. Re-running the same seed creates nothing new.
    pub async fn apply_seed(&self, seed: &TopologySeed) -> Result<SeedSummary> {
        let mut summary = SeedSummary::default();

        for origin in &seed.origins {
            if self.get_origin(&origin.id).await?.is_none() {
                summary.origins += 1;
            }
            self.create_origin(&origin.id, &origin.name).await?;
        }

        let before = self.list_subnets().await?.len();
        for subnet in &seed.subnets {
            self.create_subnet(subnet)
                .await
                .with_context(|| format!("Failed to seed subnet {}", subnet.cidr))?;
        }
        summary.subnets = self.list_subnets().await?.len() - before;

        for iface in &seed.interfaces {
            if self.find_known_interface(&iface.node_id, &iface.name).await?.is_some() {
                continue;
            }

            let mut parents = Vec::with_capacity(iface.parents.len());
            for parent in &iface.parents {
                let found = self
                    .find_known_interface(&iface.node_id, parent)
                    .await?
                    .with_context(|| {
                        format!("Parent {} of {}/{} is not seeded", parent, iface.node_id, iface.name)
                    })?;
                parents.push(found.id());
            }

            self.create_interface(&CreateInterfaceRequest {
                node_id: iface.node_id.clone(),
                name: iface.name.clone(),
                kind: iface.kind,
                mac: iface.mac.clone(),
                vlan_id: iface.vlan_id,
                parents,
            })
            .await?;
            summary.interfaces += 1;
        }

        tracing::info!(
            "Seeded {} origin(s), {} subnet(s), {} interface(s)",
            summary.origins,
            summary.subnets,
            summary.interfaces
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: &str = r#"{
        "origins": [{"id": "c1", "name": "rack-1"}],
        "subnets": [{
            "cidr": "10.0.0.0/24",
            "vlan_id": 5001,
            "managed": [{
                "origin_id": "c1",
                "name": "eth1",
                "dynamic_range": {"start": "10.0.0.100", "end": "10.0.0.200"}
            }]
        }],
        "interfaces": [
            {"node_id": "node-1", "name": "eth0", "kind": "physical", "mac": "AA-BB-CC-DD-EE-01", "vlan_id": 5001},
            {"node_id": "node-1", "name": "bond0", "kind": "bond", "mac": "aa:bb:cc:dd:ee:01", "parents": ["eth0"]}
        ]
    }"#;

    #[test]
    fn test_parse_seed() {
        let seed = TopologySeed::from_json(SEED).unwrap();
        assert_eq!(seed.origins.len(), 1);
        assert_eq!(seed.subnets[0].managed[0].static_range, None);
        assert_eq!(seed.interfaces[0].mac.as_str(), "aa:bb:cc:dd:ee:01");
        assert_eq!(seed.interfaces[1].kind, KnownInterfaceKind::Bond);
    }

    #[test]
    fn test_parse_seed_rejects_bad_mac() {
        let raw = r#"{"interfaces": [{"node_id": "n", "name": "eth0", "kind": "physical", "mac": "nope"}]}"#;
        assert!(TopologySeed::from_json(raw).is_err());
    }

    #[tokio::test]
    async fn test_apply_seed_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().join("seed.db").to_str().unwrap()).await.unwrap();
        let seed = TopologySeed::from_json(SEED).unwrap();

        let first = store.apply_seed(&seed).await.unwrap();
        assert_eq!(first, SeedSummary { origins: 1, subnets: 1, interfaces: 2 });

        let second = store.apply_seed(&seed).await.unwrap();
        assert_eq!(second, SeedSummary::default());

        let bond = store.find_known_interface("node-1", "bond0").await.unwrap().unwrap();
        let eth0 = store.find_known_interface("node-1", "eth0").await.unwrap().unwrap();
        match bond {
            Interface::Known(k) => assert_eq!(k.parents, vec![eth0.id()]),
            Interface::Unknown(_) => panic!("bond seeded as unknown"),
        }
    }

    #[tokio::test]
    async fn test_apply_seed_requires_parents_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().join("seed.db").to_str().unwrap()).await.unwrap();
        let raw = r#"{"interfaces": [
            {"node_id": "n", "name": "bond0", "kind": "bond", "mac": "aa:bb:cc:dd:ee:02", "parents": ["eth9"]}
        ]}"#;
        let seed = TopologySeed::from_json(raw).unwrap();
        assert!(store.apply_seed(&seed).await.is_err());
    }
}
