//! Depot en memoria: artifacts descargados (presentes) y desplegados.

use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use rt_core::NodeId;

#[derive(Debug, Default)]
pub struct Depot {
    present: DashMap<NodeId, Arc<Vec<u8>>>,
    deployed: DashSet<NodeId>,
}

impl Depot {
    pub fn new() -> Self { Self::default() }

    pub fn is_present(&self, id: &NodeId) -> bool { self.present.contains_key(id) }

    pub fn is_deployed(&self, id: &NodeId) -> bool { self.deployed.contains(id) }

    pub fn put(&self, id: NodeId, payload: Vec<u8>) { self.present.insert(id, Arc::new(payload)); }

    pub fn payload(&self, id: &NodeId) -> Option<Arc<Vec<u8>>> { self.present.get(id).map(|p| p.value().clone()) }

    pub fn deploy(&self, id: NodeId) { self.deployed.insert(id); }

    pub fn undeploy(&self, id: &NodeId) -> bool { self.deployed.remove(id).is_some() }

    /// Ids desplegados, ordenados.
    pub fn deployed_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.deployed.iter().map(|id| id.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn present_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.present.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_presence_and_deployment_separately() {
        let depot = Depot::new();
        depot.put("a".into(), vec![1, 2, 3]);
        assert!(depot.is_present(&"a".into()));
        assert!(!depot.is_deployed(&"a".into()));
        depot.deploy("a".into());
        depot.deploy("b".into());
        assert_eq!(depot.deployed_ids(), vec![NodeId::from("a"), NodeId::from("b")]);
        assert!(depot.undeploy(&"b".into()));
        assert!(!depot.undeploy(&"b".into()));
        assert_eq!(depot.payload(&"a".into()).map(|p| p.len()), Some(3));
    }
}
