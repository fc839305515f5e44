//! Orquestador del setup de runtime.
//!
//! Secuencia de `update`:
//! 1. hash cache: si coincide, nada que hacer;
//! 2. solve (`SolveStart`/`SolveSuccess`/`SolveError`);
//! 3. clausura runtime para la plataforma del host;
//! 4. conjuntos a instalar, descargar, construir y desinstalar;
//! 5. fallos de build cacheados;
//! 6. `Start`; 7. build o `BuildSkipped`; 8. descargas concurrentes;
//! 9. undeploy; 10. instalaciones concurrentes; 11. guardar hash;
//! 12. `Success`, o `Failure` ante cualquier error desde el paso 6.

use std::collections::BTreeSet;
use std::sync::Arc;

use indexmap::IndexMap;
use log::{debug, info, warn};
use rt_core::{fingerprint, recursive_dependencies_for, runtime_closure, ArtifactMap, ArtifactStatus, BuildPlan, NodeId,
              PlatformResolver, ResolveOptions, ResolvedArtifact};
use rt_progress::{ArtifactNames, Phase, SetupEvent, SetupEventHandler};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::collaborators::{BuildMonitor, Downloader, Installer, ProgressReport, SetupRequest, Solver};
use crate::config::SetupConfig;
use crate::depot::Depot;
use crate::errors::SetupError;
use crate::hash::RuntimeHashCache;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupOutcome {
    /// El hash coincidió; no se emitió ningún evento.
    UpToDate,
    Updated(SetupSummary),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupSummary {
    pub artifacts: ArtifactMap,
    /// Huella de `artifacts` (ver `rt_core::fingerprint`).
    pub fingerprint: String,
    pub built: Vec<NodeId>,
    pub downloaded: Vec<NodeId>,
    pub installed: Vec<NodeId>,
    pub uninstalled: Vec<NodeId>,
}

/// Conjuntos de trabajo derivados de la clausura y el estado del depot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupPlan {
    pub to_install: Vec<NodeId>,
    pub to_download: Vec<NodeId>,
    pub to_build: Vec<NodeId>,
    pub to_uninstall: Vec<NodeId>,
}

impl SetupPlan {
    /// - instalar = clausura - desplegados
    /// - descargar = instalar - presentes en el depot
    /// - construir = descargar + sus dependencias, si su estado no es SUCCEEDED
    /// - desinstalar = desplegados - clausura
    pub fn compute(plan: &BuildPlan, closure: &ArtifactMap, depot: &Depot) -> Self {
        let deployed: BTreeSet<NodeId> = depot.deployed_ids().into_iter().collect();
        let to_install: Vec<NodeId> = closure.keys().filter(|id| !deployed.contains(*id)).cloned().collect();
        let to_download: Vec<NodeId> = to_install.iter().filter(|id| !depot.is_present(id)).cloned().collect();

        let mut candidates: BTreeSet<NodeId> = to_download.iter().cloned().collect();
        for id in &to_download {
            candidates.extend(recursive_dependencies_for(id, closure));
        }
        let to_build = candidates.into_iter()
                                 .filter(|id| plan.artifact(id).is_some_and(|a| a.status != ArtifactStatus::Succeeded))
                                 .collect();
        let to_uninstall = deployed.into_iter().filter(|id| !closure.contains_key(id)).collect();
        Self { to_install, to_download, to_build, to_uninstall }
    }
}

pub struct RuntimeSetup {
    config: SetupConfig,
    platform: Arc<dyn PlatformResolver + Send + Sync>,
    solver: Arc<dyn Solver>,
    builder: Arc<dyn BuildMonitor>,
    downloader: Arc<dyn Downloader>,
    installer: Arc<dyn Installer>,
    depot: Arc<Depot>,
    hash_cache: RuntimeHashCache,
}

impl RuntimeSetup {
    pub fn new(config: SetupConfig,
               platform: Arc<dyn PlatformResolver + Send + Sync>,
               solver: Arc<dyn Solver>,
               builder: Arc<dyn BuildMonitor>,
               downloader: Arc<dyn Downloader>,
               installer: Arc<dyn Installer>)
               -> Self {
        let hash_cache = RuntimeHashCache::new(config.state_dir.clone());
        Self { config, platform, solver, builder, downloader, installer, depot: Arc::new(Depot::new()), hash_cache }
    }

    /// Reemplaza el depot (p. ej. para compartirlo entre actualizaciones).
    pub fn with_depot(mut self, depot: Arc<Depot>) -> Self {
        self.depot = depot;
        self
    }

    pub fn depot(&self) -> &Arc<Depot> { &self.depot }

    pub fn hash_cache(&self) -> &RuntimeHashCache { &self.hash_cache }

    pub fn config(&self) -> &SetupConfig { &self.config }

    pub async fn update(&self,
                        request: &SetupRequest,
                        events: Arc<dyn SetupEventHandler>)
                        -> Result<SetupOutcome, SetupError> {
        if self.hash_cache.matches(&request.namespace, request.hash_content())? {
            info!("runtime for {} is up to date", request.namespace);
            return Ok(SetupOutcome::UpToDate);
        }

        events.handle(&SetupEvent::SolveStart)?;
        let plan = match self.solver.solve(request).await {
            Ok(plan) => plan,
            Err(e) => {
                events.handle(&SetupEvent::SolveError { message: e.to_string() })?;
                return Err(e);
            }
        };
        events.handle(&SetupEvent::SolveSuccess)?;

        let platform_id = self.platform.current_platform_id()?;
        let closure = runtime_closure(&plan, &platform_id, ResolveOptions::default().with_allow_failed(true))?;
        let work = SetupPlan::compute(&plan, &closure, &self.depot);
        debug!("setup plan: {} to install, {} to download, {} to build, {} to uninstall",
               work.to_install.len(),
               work.to_download.len(),
               work.to_build.len(),
               work.to_uninstall.len());

        for id in &work.to_build {
            if let Some(a) = plan.artifact(id).filter(|a| a.status.is_failure()) {
                let name = closure.get(id).map_or_else(|| a.display_name.clone(), |r| r.name.clone());
                return Err(SetupError::ArtifactCachedBuildFailed { artifact_id: id.clone(), name, status: a.status });
            }
        }

        events.handle(&SetupEvent::Start { recipe_id: Uuid::new_v4(),
                                           requires_build: !work.to_build.is_empty(),
                                           log_file_path: None,
                                           artifacts_to_build: names_for(&work.to_build, &closure),
                                           artifacts_to_download: names_for(&work.to_download, &closure),
                                           artifacts_to_install: names_for(&work.to_install, &closure) })?;

        match self.run_phases(request, &closure, &work, events.clone()).await {
            Ok(summary) => {
                events.handle(&SetupEvent::Success)?;
                Ok(SetupOutcome::Updated(summary))
            }
            Err(e) => {
                if let Err(pe) = events.handle(&SetupEvent::Failure { message: e.to_string() }) {
                    warn!("could not report setup failure: {pe}");
                }
                Err(e)
            }
        }
    }

    async fn run_phases(&self,
                        request: &SetupRequest,
                        closure: &ArtifactMap,
                        work: &SetupPlan,
                        events: Arc<dyn SetupEventHandler>)
                        -> Result<SetupSummary, SetupError> {
        if work.to_build.is_empty() {
            events.handle(&SetupEvent::BuildSkipped)?;
        } else {
            events.handle(&SetupEvent::BuildStarted { log_file_path: None })?;
            let to_build = names_for(&work.to_build, closure);
            if let Err(e) = self.builder.build(&to_build, events.clone()).await {
                events.handle(&SetupEvent::BuildFailure { message: e.to_string() })?;
                return Err(e);
            }
            events.handle(&SetupEvent::BuildSuccess)?;
        }

        let downloaded = self.download_all(closure, &work.to_download, events.clone()).await?;

        for id in &work.to_uninstall {
            self.installer.uninstall(id).await?;
            self.depot.undeploy(id);
            debug!("undeployed {id}");
        }

        let installed = self.install_all(closure, &work.to_install, events.clone()).await?;

        self.hash_cache.store(&request.namespace, request.hash_content())?;

        Ok(SetupSummary { artifacts: closure.clone(),
                          fingerprint: fingerprint(closure)?,
                          built: work.to_build.clone(),
                          downloaded,
                          installed,
                          uninstalled: work.to_uninstall.clone() })
    }

    async fn download_all(&self,
                          closure: &ArtifactMap,
                          ids: &[NodeId],
                          events: Arc<dyn SetupEventHandler>)
                          -> Result<Vec<NodeId>, SetupError> {
        let permits = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut tasks = JoinSet::new();
        for id in ids {
            let artifact = resolved(closure, id)?;
            let (permits, events, downloader, depot) =
                (permits.clone(), events.clone(), self.downloader.clone(), self.depot.clone());
            tasks.spawn(async move {
                     let _permit = permits.acquire_owned().await.map_err(|e| SetupError::Worker(e.to_string()))?;
                     let report = ProgressReport::new(artifact.artifact_id.clone(), Phase::Download, events.clone());
                     match downloader.download(&artifact, &report).await {
                         Ok(payload) => {
                             if !report.was_started() {
                                 report.start(payload.len() as u64)?;
                             }
                             depot.put(artifact.artifact_id.clone(), payload);
                             events.handle(&SetupEvent::ArtifactDownloadSuccess { artifact_id: artifact.artifact_id.clone() })?;
                             Ok(artifact.artifact_id)
                         }
                         Err(e) => {
                             events.handle(&SetupEvent::ArtifactDownloadFailure { artifact_id: artifact.artifact_id.clone(),
                                                                                  message: e.to_string() })?;
                             Err(e)
                         }
                     }
                 });
        }
        join_all(tasks).await
    }

    async fn install_all(&self,
                         closure: &ArtifactMap,
                         ids: &[NodeId],
                         events: Arc<dyn SetupEventHandler>)
                         -> Result<Vec<NodeId>, SetupError> {
        let permits = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut tasks = JoinSet::new();
        for id in ids {
            let artifact = resolved(closure, id)?;
            let payload = self.depot.payload(id).ok_or_else(|| SetupError::MissingPayload(id.clone()))?;
            let (permits, events, installer, depot) =
                (permits.clone(), events.clone(), self.installer.clone(), self.depot.clone());
            tasks.spawn(async move {
                     let _permit = permits.acquire_owned().await.map_err(|e| SetupError::Worker(e.to_string()))?;
                     let report = ProgressReport::new(artifact.artifact_id.clone(), Phase::Install, events.clone());
                     match installer.install(&artifact, &payload, &report).await {
                         Ok(()) => {
                             if !report.was_started() {
                                 report.start(payload.len() as u64)?;
                             }
                             depot.deploy(artifact.artifact_id.clone());
                             events.handle(&SetupEvent::ArtifactInstallSuccess { artifact_id: artifact.artifact_id.clone() })?;
                             Ok(artifact.artifact_id)
                         }
                         Err(e) => {
                             events.handle(&SetupEvent::ArtifactInstallFailure { artifact_id: artifact.artifact_id.clone(),
                                                                                 message: e.to_string() })?;
                             Err(e)
                         }
                     }
                 });
        }
        join_all(tasks).await
    }
}

fn resolved(closure: &ArtifactMap, id: &NodeId) -> Result<ResolvedArtifact, SetupError> {
    closure.get(id).cloned().ok_or_else(|| SetupError::MissingPayload(id.clone()))
}

fn names_for(ids: &[NodeId], closure: &ArtifactMap) -> ArtifactNames {
    ids.iter()
       .map(|id| {
           let name = closure.get(id).map_or_else(|| id.to_string(), ResolvedArtifact::name_with_version);
           (id.clone(), name)
       })
       .collect::<IndexMap<_, _>>()
}

/// Espera todas las tareas; devuelve los ids completados, ordenados, o el
/// primer error. Las demás tareas terminan igualmente.
async fn join_all(mut tasks: JoinSet<Result<NodeId, SetupError>>) -> Result<Vec<NodeId>, SetupError> {
    let mut done = Vec::new();
    let mut first_err = None;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(id)) => done.push(id),
            Ok(Err(e)) => {
                first_err.get_or_insert(e);
            }
            Err(e) => {
                first_err.get_or_insert(SetupError::Worker(e.to_string()));
            }
        }
    }
    match first_err {
        Some(e) => Err(e),
        None => {
            done.sort();
            Ok(done)
        }
    }
}
