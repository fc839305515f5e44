//! Colaboradores externos del setup: solver, build, descarga e instalación.
//!
//! El transporte real (red, disco) queda detrás de estos traits; el
//! orquestador sólo coordina y emite eventos.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use rt_core::{BuildPlan, NodeId, ResolvedArtifact};
use rt_progress::{ArtifactNames, Phase, SetupEvent, SetupEventHandler};

use crate::errors::SetupError;

/// Petición de actualización del runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupRequest {
    pub namespace: String,
    pub commit_id: String,
    /// Script de build local; si existe, reemplaza al commit en el hash.
    pub build_script: Option<String>,
}

impl SetupRequest {
    pub fn new(namespace: impl Into<String>, commit_id: impl Into<String>) -> Self {
        Self { namespace: namespace.into(), commit_id: commit_id.into(), build_script: None }
    }

    /// Contenido que identifica el estado pedido (commit o script).
    pub fn hash_content(&self) -> &str { self.build_script.as_deref().unwrap_or(&self.commit_id) }
}

#[async_trait]
pub trait Solver: Send + Sync {
    async fn solve(&self, request: &SetupRequest) -> Result<BuildPlan, SetupError>;
}

/// Dispara el build remoto de los artifacts y reporta por artifact
/// (`ArtifactBuild*`) en `events` hasta que todos terminan.
#[async_trait]
pub trait BuildMonitor: Send + Sync {
    async fn build(&self, to_build: &ArtifactNames, events: Arc<dyn SetupEventHandler>) -> Result<(), SetupError>;
}

#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(&self, artifact: &ResolvedArtifact, progress: &ProgressReport) -> Result<Vec<u8>, SetupError>;
}

#[async_trait]
pub trait Installer: Send + Sync {
    async fn install(&self,
                     artifact: &ResolvedArtifact,
                     payload: &[u8],
                     progress: &ProgressReport)
                     -> Result<(), SetupError>;

    async fn uninstall(&self, artifact_id: &NodeId) -> Result<(), SetupError>;
}

/// Reporte de progreso de un artifact en una fase (descarga o instalación).
pub struct ProgressReport {
    artifact_id: NodeId,
    phase: Phase,
    events: Arc<dyn SetupEventHandler>,
    started: AtomicBool,
}

impl ProgressReport {
    pub fn new(artifact_id: NodeId, phase: Phase, events: Arc<dyn SetupEventHandler>) -> Self {
        Self { artifact_id, phase, events, started: AtomicBool::new(false) }
    }

    pub fn artifact_id(&self) -> &NodeId { &self.artifact_id }

    pub fn was_started(&self) -> bool { self.started.load(Ordering::SeqCst) }

    /// Emite el evento de inicio con el tamaño total, una sola vez.
    pub fn start(&self, total_size: u64) -> Result<(), SetupError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let artifact_id = self.artifact_id.clone();
        let event = match self.phase {
            Phase::Install => SetupEvent::ArtifactInstallStarted { artifact_id, total_size },
            _ => SetupEvent::ArtifactDownloadStarted { artifact_id, total_size },
        };
        Ok(self.events.handle(&event)?)
    }

    pub fn advance(&self, increment: u64) -> Result<(), SetupError> {
        let artifact_id = self.artifact_id.clone();
        let event = match self.phase {
            Phase::Install => SetupEvent::ArtifactInstallProgress { artifact_id, increment },
            _ => SetupEvent::ArtifactDownloadProgress { artifact_id, increment },
        };
        Ok(self.events.handle(&event)?)
    }
}
