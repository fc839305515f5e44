//! Backend simulado: solver, build, descarga e instalación en memoria.
//!
//! Sirve para el demo y los tests. El plan se puede reemplazar entre
//! actualizaciones y cada colaborador admite fallos inyectados.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use parking_lot::Mutex;
use rt_core::{BuildPlan, NodeId, ResolvedArtifact};
use rt_progress::{ArtifactNames, SetupEvent, SetupEventHandler};

use crate::collaborators::{BuildMonitor, Downloader, Installer, ProgressReport, SetupRequest, Solver};
use crate::errors::SetupError;

pub const DEFAULT_CHUNK_SIZE: usize = 64;

#[derive(Debug, Default)]
struct Failures {
    solve: Option<String>,
    build: BTreeSet<NodeId>,
    download: BTreeSet<NodeId>,
    install: BTreeSet<NodeId>,
}

#[derive(Debug)]
pub struct SimulatedBackend {
    plan: Mutex<BuildPlan>,
    chunk_size: usize,
    failures: Mutex<Failures>,
    installed: Mutex<BTreeSet<NodeId>>,
    solves: Mutex<usize>,
}

impl SimulatedBackend {
    pub fn new(plan: BuildPlan) -> Self {
        Self { plan: Mutex::new(plan),
               chunk_size: DEFAULT_CHUNK_SIZE,
               failures: Mutex::new(Failures::default()),
               installed: Mutex::new(BTreeSet::new()),
               solves: Mutex::new(0) }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn set_plan(&self, plan: BuildPlan) { *self.plan.lock() = plan; }

    pub fn fail_solve(&self, message: impl Into<String>) { self.failures.lock().solve = Some(message.into()); }

    pub fn fail_build(&self, id: impl Into<NodeId>) { self.failures.lock().build.insert(id.into()); }

    pub fn fail_download(&self, id: impl Into<NodeId>) { self.failures.lock().download.insert(id.into()); }

    pub fn fail_install(&self, id: impl Into<NodeId>) { self.failures.lock().install.insert(id.into()); }

    pub fn clear_failures(&self) { *self.failures.lock() = Failures::default(); }

    /// Artifacts instalados actualmente, ordenados.
    pub fn installed(&self) -> Vec<NodeId> { self.installed.lock().iter().cloned().collect() }

    pub fn solve_count(&self) -> usize { *self.solves.lock() }

    /// Contenido determinista de un artifact: su nombre repetido hasta
    /// superar unos cientos de bytes.
    pub fn payload_for(artifact: &ResolvedArtifact) -> Vec<u8> {
        let seed = format!("{}@{};", artifact.qualified_name(), artifact.version);
        seed.repeat(256 / seed.len().max(1) + 1).into_bytes()
    }

    async fn report_chunks(&self, progress: &ProgressReport, total: usize) -> Result<(), SetupError> {
        progress.start(total as u64)?;
        let mut sent = 0;
        while sent < total {
            let step = self.chunk_size.min(total - sent);
            progress.advance(step as u64)?;
            sent += step;
            tokio::task::yield_now().await;
        }
        Ok(())
    }
}

#[async_trait]
impl Solver for SimulatedBackend {
    async fn solve(&self, request: &SetupRequest) -> Result<BuildPlan, SetupError> {
        *self.solves.lock() += 1;
        if let Some(message) = self.failures.lock().solve.clone() {
            return Err(SetupError::Solve(message));
        }
        debug!("solved {} at {}", request.namespace, request.commit_id);
        Ok(self.plan.lock().clone())
    }
}

#[async_trait]
impl BuildMonitor for SimulatedBackend {
    async fn build(&self, to_build: &ArtifactNames, events: Arc<dyn SetupEventHandler>) -> Result<(), SetupError> {
        let failing = self.failures.lock().build.clone();
        let mut failed = Vec::new();
        for (id, name) in to_build {
            events.handle(&SetupEvent::ArtifactBuildStarted { artifact_id: id.clone(), from_cache: false })?;
            events.handle(&SetupEvent::ArtifactBuildProgress { artifact_id: id.clone(),
                                                               message: format!("building {name}") })?;
            tokio::task::yield_now().await;
            if failing.contains(id) {
                events.handle(&SetupEvent::ArtifactBuildFailure { artifact_id: id.clone(),
                                                                  message: format!("{name} failed to build") })?;
                failed.push(name.clone());
            } else {
                events.handle(&SetupEvent::ArtifactBuildSuccess { artifact_id: id.clone(), log_uri: None })?;
            }
        }
        if failed.is_empty() {
            Ok(())
        } else {
            Err(SetupError::BuildFailed(failed.join(", ")))
        }
    }
}

#[async_trait]
impl Downloader for SimulatedBackend {
    async fn download(&self, artifact: &ResolvedArtifact, progress: &ProgressReport) -> Result<Vec<u8>, SetupError> {
        if self.failures.lock().download.contains(&artifact.artifact_id) {
            return Err(SetupError::Download { artifact_id: artifact.artifact_id.clone(),
                                              message: "connection reset".into() });
        }
        let payload = Self::payload_for(artifact);
        self.report_chunks(progress, payload.len()).await?;
        Ok(payload)
    }
}

#[async_trait]
impl Installer for SimulatedBackend {
    async fn install(&self,
                     artifact: &ResolvedArtifact,
                     payload: &[u8],
                     progress: &ProgressReport)
                     -> Result<(), SetupError> {
        if self.failures.lock().install.contains(&artifact.artifact_id) {
            return Err(SetupError::Install { artifact_id: artifact.artifact_id.clone(),
                                             message: "disk full".into() });
        }
        self.report_chunks(progress, payload.len()).await?;
        self.installed.lock().insert(artifact.artifact_id.clone());
        Ok(())
    }

    async fn uninstall(&self, artifact_id: &NodeId) -> Result<(), SetupError> {
        self.installed.lock().remove(artifact_id);
        Ok(())
    }
}
