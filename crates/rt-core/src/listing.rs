//! Listado de artifacts de un plan con clausuras calculadas a demanda.

use once_cell::unsync::OnceCell;

use crate::errors::ResolveError;
use crate::model::{ArtifactMap, BuildPlan, NodeId, ResolvedArtifact};
use crate::resolve::{buildtime_closure, runtime_closure, ClosureKind, ResolveOptions};

/// Mantiene el plan y cachea cada clausura la primera vez que se pide.
pub struct ArtifactListing {
    plan: BuildPlan,
    platform_id: String,
    opts: ResolveOptions,
    runtime: OnceCell<ArtifactMap>,
    buildtime: OnceCell<ArtifactMap>,
}

impl ArtifactListing {
    pub fn new(plan: BuildPlan, platform_id: impl Into<String>, opts: ResolveOptions) -> Self {
        Self { plan, platform_id: platform_id.into(), opts, runtime: OnceCell::new(), buildtime: OnceCell::new() }
    }

    pub fn plan(&self) -> &BuildPlan { &self.plan }

    pub fn platform_id(&self) -> &str { &self.platform_id }

    pub fn runtime_closure(&self) -> Result<&ArtifactMap, ResolveError> {
        self.runtime.get_or_try_init(|| runtime_closure(&self.plan, &self.platform_id, self.opts))
    }

    pub fn buildtime_closure(&self) -> Result<&ArtifactMap, ResolveError> {
        self.buildtime.get_or_try_init(|| buildtime_closure(&self.plan, &self.platform_id, self.opts))
    }

    pub fn closure(&self, kind: ClosureKind) -> Result<&ArtifactMap, ResolveError> {
        match kind {
            ClosureKind::Runtime => self.runtime_closure(),
            ClosureKind::Buildtime => self.buildtime_closure(),
        }
    }

    pub fn artifact_ids(&self, kind: ClosureKind) -> Result<Vec<NodeId>, ResolveError> {
        Ok(self.closure(kind)?.keys().cloned().collect())
    }

    /// Artifacts cuyo id empieza con `prefix`.
    pub fn find_by_prefix(&self, prefix: &str, kind: ClosureKind) -> Result<Vec<&ResolvedArtifact>, ResolveError> {
        Ok(self.closure(kind)?.values().filter(|a| a.artifact_id.as_str().starts_with(prefix)).collect())
    }
}
