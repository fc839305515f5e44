//! Registros de salida de la resolución.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::NodeId;

/// Artifact resuelto: identidad del ingrediente más sus dependencias
/// deduplicadas (directas y transitivas).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedArtifact {
    pub artifact_id: NodeId,
    pub name: String,
    pub namespace: String,
    pub version: String,
    pub dependencies: Vec<NodeId>,
    pub generated_by: NodeId,
    pub url: String,
    pub mime_type: String,
}

impl ResolvedArtifact {
    /// `name@version`, usado en listados y resúmenes.
    pub fn name_with_version(&self) -> String {
        if self.version.is_empty() {
            self.name.clone()
        } else {
            format!("{}@{}", self.name, self.version)
        }
    }

    /// Clave `namespace/name`, estable entre commits.
    pub fn qualified_name(&self) -> String { format!("{}/{}", self.namespace, self.name) }
}

/// `ArtifactId -> ResolvedArtifact`. Ordenado para que el fingerprint y los
/// listados sean deterministas; el orden no tiene semántica.
pub type ArtifactMap = BTreeMap<NodeId, ResolvedArtifact>;

/// Mismo contenido indexado por nombre, para comparar entre commits.
pub type NamedArtifactMap = BTreeMap<String, ResolvedArtifact>;

/// Un `ArtifactMap` por tag de terminal.
pub type TerminalArtifactMap = BTreeMap<String, ArtifactMap>;

/// Reindexa un mapa por nombre. Si dos artifacts comparten nombre gana el
/// último en orden de id.
pub fn to_named(map: &ArtifactMap) -> NamedArtifactMap {
    map.values().map(|a| (a.name.clone(), a.clone())).collect()
}
