//! Tabla de búsqueda del grafo.
//!
//! Indexa artifacts, steps y sources por `NodeId` como una suma de
//! variantes. Cada sitio de recorrido hace `match` exhaustivo sobre
//! `Node`, de modo que un tipo de nodo nuevo obliga a revisar todos.

use std::collections::HashMap;

use crate::errors::ResolveError;
use crate::model::{Artifact, BuildPlan, NodeId, Source, Step};

#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Artifact(&'a Artifact),
    Step(&'a Step),
    Source(&'a Source),
}

impl<'a> Node<'a> {
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Artifact(_) => "artifact",
            Node::Step(_) => "step",
            Node::Source(_) => "source",
        }
    }
}

pub struct LookupTable<'a> {
    nodes: HashMap<&'a NodeId, Node<'a>>,
}

impl<'a> LookupTable<'a> {
    pub fn new(plan: &'a BuildPlan) -> Self {
        let mut nodes = HashMap::with_capacity(plan.artifacts.len() + plan.steps.len() + plan.sources.len());
        for a in &plan.artifacts {
            nodes.insert(&a.node_id, Node::Artifact(a));
        }
        for s in &plan.steps {
            nodes.insert(&s.step_id, Node::Step(s));
        }
        for s in &plan.sources {
            nodes.insert(&s.node_id, Node::Source(s));
        }
        Self { nodes }
    }

    pub fn get(&self, id: &NodeId) -> Option<Node<'a>> { self.nodes.get(id).copied() }

    pub fn len(&self) -> usize { self.nodes.len() }

    pub fn is_empty(&self) -> bool { self.nodes.is_empty() }

    /// Artifact con ese id; error de integridad si falta o es de otro tipo.
    pub fn artifact(&self, id: &NodeId) -> Result<&'a Artifact, ResolveError> {
        match self.get(id) {
            Some(Node::Artifact(a)) => Ok(a),
            Some(_) => Err(ResolveError::UnexpectedNodeKind { id: id.clone(), expected: "artifact" }),
            None => Err(ResolveError::NodeNotFound(id.clone())),
        }
    }

    /// Step con ese id, o `None` si el id no resuelve a un step.
    pub fn step(&self, id: &NodeId) -> Option<&'a Step> {
        match self.get(id) {
            Some(Node::Step(s)) => Some(s),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn indexes_every_node_kind() {
        let plan = BuildPlan::from_json_value(json!({
            "steps": [{"stepId": "s1"}],
            "artifacts": [{"nodeId": "a1", "mimeType": "m", "status": "SUCCEEDED", "generatedBy": "s1"}],
            "sources": [{"nodeId": "src1", "name": "n", "namespace": "ns", "version": "1"}]
        }))
        .unwrap();
        let lookup = LookupTable::new(&plan);
        assert_eq!(lookup.len(), 3);
        assert_eq!(lookup.get(&"s1".into()).map(|n| n.kind()), Some("step"));
        assert_eq!(lookup.get(&"src1".into()).map(|n| n.kind()), Some("source"));
        assert!(lookup.artifact(&"a1".into()).is_ok());
        assert_eq!(lookup.artifact(&"s1".into()).unwrap_err(), ResolveError::UnexpectedNodeKind { id: "s1".into(), expected: "artifact" });
        assert_eq!(lookup.artifact(&"zz".into()).unwrap_err(), ResolveError::NodeNotFound("zz".into()));
        assert!(lookup.step(&"a1".into()).is_none());
    }
}
