//! rt-core: resolución de planes de build a mapas de artifacts.
pub mod changeset;
pub mod constants;
pub mod errors;
pub mod expand;
pub mod hashing;
pub mod listing;
pub mod lookup;
pub mod model;
pub mod resolve;

pub use changeset::{ArtifactUpdate, ChangeSummary, Changeset, SummaryEntry};
pub use errors::ResolveError;
pub use hashing::fingerprint;
pub use expand::{dependency_tree_for, direct_dependencies, recursive_dependencies_for};
pub use listing::ArtifactListing;
pub use lookup::{LookupTable, Node};
pub use model::{to_named, Artifact, ArtifactMap, ArtifactStatus, BuildPlan, NamedArtifactMap, NodeId, ResolvedArtifact,
                Source, SourceInfo, Step, StepInput, Terminal, TerminalArtifactMap};
pub use resolve::{buildtime_closure, named_runtime_closure, resolve_terminal_maps, runtime_closure, ClosureBuilder,
                  ClosureKind, ResolveOptions};

/// Plataforma del host. Abstrae cómo se determina el id de plataforma actual.
pub trait PlatformResolver {
    fn current_platform_id(&self) -> Result<String, ResolveError>;
}

/// Resolver con un id de plataforma fijo.
#[derive(Debug, Clone)]
pub struct FixedPlatform(pub String);

impl PlatformResolver for FixedPlatform {
    fn current_platform_id(&self) -> Result<String, ResolveError> { Ok(self.0.clone()) }
}
