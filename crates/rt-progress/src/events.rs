//! Vocabulario de eventos del setup de runtime.
//!
//! El orquestador emite estos eventos en orden estricto; el primero debe ser
//! siempre `Start`. Los eventos por artifact llevan el id del artifact y la
//! fase se deduce del tipo de evento.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use rt_core::NodeId;
use serde::Serialize;
use uuid::Uuid;

/// Artifacts esperados en una fase: id -> nombre a mostrar.
pub type ArtifactNames = IndexMap<NodeId, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Phase {
    Solve,
    Build,
    Download,
    Install,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::Solve, Phase::Build, Phase::Download, Phase::Install];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Solve => "solve",
            Phase::Build => "build",
            Phase::Download => "download",
            Phase::Install => "install",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SetupEvent {
    /// Primer evento obligatorio. Fija los artifacts esperados por fase.
    Start {
        recipe_id: Uuid,
        requires_build: bool,
        log_file_path: Option<PathBuf>,
        artifacts_to_build: ArtifactNames,
        artifacts_to_download: ArtifactNames,
        artifacts_to_install: ArtifactNames,
    },
    /// El pipeline terminó bien; habilita la verificación de totales al cerrar.
    Success,
    Failure { message: String },

    SolveStart,
    SolveSuccess,
    SolveError { message: String },

    BuildStarted { log_file_path: Option<PathBuf> },
    BuildSkipped,
    BuildSuccess,
    /// Aborta las barras de build, descarga e instalación.
    BuildFailure { message: String },

    ArtifactBuildStarted { artifact_id: NodeId, from_cache: bool },
    ArtifactBuildProgress { artifact_id: NodeId, message: String },
    ArtifactBuildSuccess { artifact_id: NodeId, log_uri: Option<String> },
    ArtifactBuildFailure { artifact_id: NodeId, message: String },

    ArtifactDownloadStarted { artifact_id: NodeId, total_size: u64 },
    ArtifactDownloadProgress { artifact_id: NodeId, increment: u64 },
    ArtifactDownloadSkipped { artifact_id: NodeId },
    ArtifactDownloadSuccess { artifact_id: NodeId },
    ArtifactDownloadFailure { artifact_id: NodeId, message: String },

    ArtifactInstallStarted { artifact_id: NodeId, total_size: u64 },
    ArtifactInstallProgress { artifact_id: NodeId, increment: u64 },
    ArtifactInstallSkipped { artifact_id: NodeId },
    ArtifactInstallSuccess { artifact_id: NodeId },
    ArtifactInstallFailure { artifact_id: NodeId, message: String },
}

impl SetupEvent {
    pub fn name(&self) -> &'static str {
        use SetupEvent::*;
        match self {
            Start { .. } => "Start",
            Success => "Success",
            Failure { .. } => "Failure",
            SolveStart => "SolveStart",
            SolveSuccess => "SolveSuccess",
            SolveError { .. } => "SolveError",
            BuildStarted { .. } => "BuildStarted",
            BuildSkipped => "BuildSkipped",
            BuildSuccess => "BuildSuccess",
            BuildFailure { .. } => "BuildFailure",
            ArtifactBuildStarted { .. } => "ArtifactBuildStarted",
            ArtifactBuildProgress { .. } => "ArtifactBuildProgress",
            ArtifactBuildSuccess { .. } => "ArtifactBuildSuccess",
            ArtifactBuildFailure { .. } => "ArtifactBuildFailure",
            ArtifactDownloadStarted { .. } => "ArtifactDownloadStarted",
            ArtifactDownloadProgress { .. } => "ArtifactDownloadProgress",
            ArtifactDownloadSkipped { .. } => "ArtifactDownloadSkipped",
            ArtifactDownloadSuccess { .. } => "ArtifactDownloadSuccess",
            ArtifactDownloadFailure { .. } => "ArtifactDownloadFailure",
            ArtifactInstallStarted { .. } => "ArtifactInstallStarted",
            ArtifactInstallProgress { .. } => "ArtifactInstallProgress",
            ArtifactInstallSkipped { .. } => "ArtifactInstallSkipped",
            ArtifactInstallSuccess { .. } => "ArtifactInstallSuccess",
            ArtifactInstallFailure { .. } => "ArtifactInstallFailure",
        }
    }

    /// Fase afectada; `None` para `Start`, `Success` y `Failure`.
    pub fn phase(&self) -> Option<Phase> {
        use SetupEvent::*;
        match self {
            Start { .. } | Success | Failure { .. } => None,
            SolveStart | SolveSuccess | SolveError { .. } => Some(Phase::Solve),
            BuildStarted { .. }
            | BuildSkipped
            | BuildSuccess
            | BuildFailure { .. }
            | ArtifactBuildStarted { .. }
            | ArtifactBuildProgress { .. }
            | ArtifactBuildSuccess { .. }
            | ArtifactBuildFailure { .. } => Some(Phase::Build),
            ArtifactDownloadStarted { .. }
            | ArtifactDownloadProgress { .. }
            | ArtifactDownloadSkipped { .. }
            | ArtifactDownloadSuccess { .. }
            | ArtifactDownloadFailure { .. } => Some(Phase::Download),
            ArtifactInstallStarted { .. }
            | ArtifactInstallProgress { .. }
            | ArtifactInstallSkipped { .. }
            | ArtifactInstallSuccess { .. }
            | ArtifactInstallFailure { .. } => Some(Phase::Install),
        }
    }

    pub fn artifact_id(&self) -> Option<&NodeId> {
        use SetupEvent::*;
        match self {
            ArtifactBuildStarted { artifact_id, .. }
            | ArtifactBuildProgress { artifact_id, .. }
            | ArtifactBuildSuccess { artifact_id, .. }
            | ArtifactBuildFailure { artifact_id, .. }
            | ArtifactDownloadStarted { artifact_id, .. }
            | ArtifactDownloadProgress { artifact_id, .. }
            | ArtifactDownloadSkipped { artifact_id }
            | ArtifactDownloadSuccess { artifact_id }
            | ArtifactDownloadFailure { artifact_id, .. }
            | ArtifactInstallStarted { artifact_id, .. }
            | ArtifactInstallProgress { artifact_id, .. }
            | ArtifactInstallSkipped { artifact_id }
            | ArtifactInstallSuccess { artifact_id }
            | ArtifactInstallFailure { artifact_id, .. } => Some(artifact_id),
            _ => None,
        }
    }
}

/// Evento registrado con su posición y marca de tiempo.
#[derive(Debug, Clone, Serialize)]
pub struct SetupEventRecord {
    pub seq: u64, // orden de llegada al handler
    pub event: SetupEvent,
    pub ts: DateTime<Utc>,
}
