//! Forma lógica del plan de build recibido del solver remoto.
//!
//! El plan es inmutable: se deserializa una vez por petición y sólo se lee
//! durante la resolución.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::NodeId;
use crate::constants::is_installable_mime;
use crate::errors::ResolveError;

/// Estado de build de un artifact tal como lo reporta el solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArtifactStatus {
    NotSubmitted,
    Blocked,
    FailedPermanently,
    FailedTransiently,
    Ready,
    Skipped,
    Started,
    Succeeded,
}

impl ArtifactStatus {
    /// Estados que no impiden continuar la resolución.
    pub fn is_success(self) -> bool {
        matches!(self, Self::Succeeded | Self::Blocked | Self::Started | Self::Ready)
    }

    pub fn is_failure(self) -> bool {
        matches!(self, Self::FailedPermanently | Self::FailedTransiently)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotSubmitted => "NOT_SUBMITTED",
            Self::Blocked => "BLOCKED",
            Self::FailedPermanently => "FAILED_PERMANENTLY",
            Self::FailedTransiently => "FAILED_TRANSIENTLY",
            Self::Ready => "READY",
            Self::Skipped => "SKIPPED",
            Self::Started => "STARTED",
            Self::Succeeded => "SUCCEEDED",
        }
    }
}

impl fmt::Display for ArtifactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Punto de entrada del DAG para un tag (normalmente `platform:<id>`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Terminal {
    pub tag: String,
    #[serde(default)]
    pub node_ids: Vec<NodeId>,
}

/// Grupo de inputs etiquetado de un step (`src`, `deps`, `builder`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepInput {
    pub tag: String,
    #[serde(default)]
    pub node_ids: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub step_id: NodeId,
    #[serde(default)]
    pub outputs: Vec<NodeId>,
    #[serde(default)]
    pub inputs: Vec<StepInput>,
}

impl Step {
    /// Ids de todos los inputs con el tag dado, en orden de declaración.
    pub fn inputs_tagged<'s>(&'s self, tag: &'s str) -> impl Iterator<Item = &'s NodeId> + 's {
        self.inputs.iter().filter(move |i| i.tag == tag).flat_map(|i| i.node_ids.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub node_id: NodeId,
    pub mime_type: String,
    pub status: ArtifactStatus,
    pub generated_by: NodeId,
    #[serde(default)]
    pub runtime_dependencies: Vec<NodeId>,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_url: Option<String>,
}

impl Artifact {
    pub fn is_installable(&self) -> bool { is_installable_mime(&self.mime_type) }
}

/// Nodo hoja con la identidad del ingrediente.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub node_id: NodeId,
    pub name: String,
    pub namespace: String,
    pub version: String,
}

/// Nombre, namespace y versión recuperados de un `Source`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    pub name: String,
    pub namespace: String,
    pub version: String,
}

impl From<&Source> for SourceInfo {
    fn from(s: &Source) -> Self {
        Self { name: s.name.clone(), namespace: s.namespace.clone(), version: s.version.clone() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildPlan {
    #[serde(default)]
    pub terminals: Vec<Terminal>,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    #[serde(default)]
    pub sources: Vec<Source>,
}

impl BuildPlan {
    pub fn from_json_str(raw: &str) -> Result<Self, ResolveError> { Ok(serde_json::from_str(raw)?) }

    pub fn from_json_value(value: serde_json::Value) -> Result<Self, ResolveError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Busca un artifact por id recorriendo la lista (sin índice).
    pub fn artifact(&self, id: &NodeId) -> Option<&Artifact> { self.artifacts.iter().find(|a| &a.node_id == id) }

    /// Ids de plataforma presentes en los terminales (`platform:<id>` sin prefijo).
    pub fn platform_ids(&self) -> Vec<String> {
        self.terminals
            .iter()
            .filter_map(|t| t.tag.strip_prefix(crate::constants::PLATFORM_TAG_PREFIX))
            .map(str::to_string)
            .collect()
    }
}
