//! Modelo de datos: plan de build (entrada) y artifacts resueltos (salida).

mod node_id;
mod plan;
mod resolved;

pub use node_id::NodeId;
pub use plan::{Artifact, ArtifactStatus, BuildPlan, Source, SourceInfo, Step, StepInput, Terminal};
pub use resolved::{to_named, ArtifactMap, NamedArtifactMap, ResolvedArtifact, TerminalArtifactMap};
