//! Errores de resolución del plan de build.
//!
//! Tres familias que el llamador necesita distinguir:
//! - integridad del grafo (`NodeNotFound`, `UnexpectedNodeKind`,
//!   `SourceNotResolved`, `CycleDetected`, `DepthExceeded`),
//! - fallo de build aguas arriba (`ArtifactFailed`),
//! - plataforma sin terminal (`NoMatchingPlatform`), que es un fallo
//!   esperado y se ofrece al usuario con remediación.

use thiserror::Error;

use crate::model::{ArtifactStatus, NodeId};

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ResolveError {
    #[error("no terminal matches platform '{platform_id}' (available: {available:?})")]
    NoMatchingPlatform { platform_id: String, available: Vec<String> },
    #[error("artifact '{display_name}' failed to build, status: {status}")]
    ArtifactFailed { artifact_id: NodeId, display_name: String, status: ArtifactStatus },
    #[error("node {0} not found in build plan")]
    NodeNotFound(NodeId),
    #[error("incorrect node kind for id {id}, expected {expected}")]
    UnexpectedNodeKind { id: NodeId, expected: &'static str },
    #[error("step input {0} does not resolve to a source or an artifact")]
    InvalidSourceInput(NodeId),
    #[error("could not resolve artifact name for {0}")]
    SourceNotResolved(NodeId),
    #[error("cycle detected at node {0}")]
    CycleDetected(NodeId),
    #[error("traversal depth exceeded at node {id} (depth {depth})")]
    DepthExceeded { id: NodeId, depth: usize },
    #[error("invalid build plan: {0}")]
    InvalidPlan(String),
}

impl ResolveError {
    /// True para errores que el usuario puede remediar (plataforma o build fallido),
    /// false para errores de integridad del grafo.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, ResolveError::NoMatchingPlatform { .. } | ResolveError::ArtifactFailed { .. })
    }
}

impl From<serde_json::Error> for ResolveError {
    fn from(e: serde_json::Error) -> Self { ResolveError::InvalidPlan(e.to_string()) }
}
