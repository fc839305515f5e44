//! Digester de progreso: máquina de estados alimentada por eventos.
//!
//! Invariantes:
//! - `Start` es el primer evento; cualquier otro antes es un error. El
//!   spinner del solve previo al `Start` lo dibuja `SolveSpinner`.
//! - Las barras agregadas se crean de forma perezosa, con el primer evento
//!   relevante de su fase, y nunca superan su total.
//! - Cada artifact esperado completa su fase una sola vez.
//! - `BuildFailure` aborta build, descarga e instalación sin bloquear.
//! - Un artifact de descarga o instalación fuera del conjunto esperado es un
//!   error. Para build se tolera con `warn!` (productores antiguos reportan
//!   artifacts que no forman parte del conjunto).
//!
//! Todo el estado vive detrás de un único `Mutex`; cada `handle` es una
//! sección crítica. El render corre en su propia tarea y `close` espera su
//! señal de fin con un timeout fijo, cancelándola si no llega.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use indicatif::{MultiProgress, ProgressDrawTarget};
use log::{debug, error, warn};
use parking_lot::Mutex;
use rt_core::NodeId;
use serde::Serialize;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::bar::{fit_label, BarState, TrackedBar};
use crate::config::DigesterConfig;
use crate::errors::ProgressError;
use crate::events::{ArtifactNames, Phase, SetupEvent};
use crate::handler::SetupEventHandler;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PhaseState {
    NotStarted,
    InProgress,
    Complete,
    Aborted,
}

#[derive(Debug, Default)]
struct PhaseSlot {
    bar: Option<TrackedBar>,
    aborted: bool,
    completed: HashSet<NodeId>,
}

impl PhaseSlot {
    fn state(&self) -> PhaseState {
        if self.aborted {
            return PhaseState::Aborted;
        }
        match self.bar.as_ref().map(TrackedBar::state) {
            None => PhaseState::NotStarted,
            Some(BarState::Active) => PhaseState::InProgress,
            Some(BarState::Complete) => PhaseState::Complete,
            Some(BarState::Aborted) => PhaseState::Aborted,
        }
    }

    fn abort(&mut self) {
        self.aborted = true;
        if let Some(bar) = self.bar.as_mut() {
            bar.abort();
        }
    }
}

struct DigesterState {
    multi: MultiProgress,
    max_name_width: usize,
    started: bool,
    success: bool,
    closing: bool,
    build_started: bool,
    expected: HashMap<Phase, ArtifactNames>,
    phases: HashMap<Phase, PhaseSlot>,
    artifact_bars: HashMap<(NodeId, Phase), TrackedBar>,
    log: Vec<&'static str>,
}

impl DigesterState {
    fn new(multi: MultiProgress, max_name_width: usize) -> Self {
        Self { multi,
               max_name_width,
               started: false,
               success: false,
               closing: false,
               build_started: false,
               expected: HashMap::new(),
               phases: Phase::ALL.into_iter().map(|p| (p, PhaseSlot::default())).collect(),
               artifact_bars: HashMap::new(),
               log: Vec::new() }
    }

    fn slot(&mut self, phase: Phase) -> &mut PhaseSlot { self.phases.entry(phase).or_default() }

    fn phase_state(&self, phase: Phase) -> PhaseState { self.phases.get(&phase).map_or(PhaseState::NotStarted, PhaseSlot::state) }

    fn active_bars(&self) -> usize {
        let phase = self.phases.values().filter_map(|s| s.bar.as_ref()).filter(|b| b.is_active()).count();
        phase + self.artifact_bars.values().filter(|b| b.is_active()).count()
    }

    fn expected_total(&self, phase: Phase) -> u64 {
        match phase {
            Phase::Solve => 1,
            _ => self.expected.get(&phase).map_or(0, |m| m.len() as u64),
        }
    }

    fn is_expected(&self, phase: Phase, id: &NodeId) -> bool {
        self.expected.get(&phase).is_some_and(|m| m.contains_key(id))
    }

    fn label_for(&self, phase: Phase, id: &NodeId) -> String {
        let name = self.expected.get(&phase).and_then(|m| m.get(id)).map_or(id.as_str(), String::as_str);
        fit_label(name, self.max_name_width)
    }

    /// Barra agregada de la fase, creada con el primer evento que la necesita.
    fn ensure_phase_bar(&mut self, phase: Phase) -> &mut TrackedBar {
        let total = self.expected_total(phase);
        let multi = self.multi.clone();
        self.slot(phase).bar.get_or_insert_with(|| {
                                match phase {
                                    Phase::Solve => TrackedBar::spinner(&multi, "Resolving dependencies"),
                                    Phase::Build => TrackedBar::aggregate(&multi, "Building", total),
                                    Phase::Download => TrackedBar::aggregate(&multi, "Downloading", total),
                                    Phase::Install => TrackedBar::aggregate(&multi, "Installing", total),
                                }
                            })
    }

    fn phase_bar(&mut self, phase: Phase) -> Result<&mut TrackedBar, ProgressError> {
        self.slot(phase).bar.as_mut().ok_or(ProgressError::PhaseNotStarted(phase))
    }

    fn require_expected(&self, phase: Phase, id: &NodeId) -> Result<(), ProgressError> {
        if self.is_expected(phase, id) {
            Ok(())
        } else {
            Err(ProgressError::UnexpectedArtifact { phase, artifact_id: id.clone() })
        }
    }

    fn is_completed(&self, phase: Phase, id: &NodeId) -> bool {
        self.phases.get(&phase).is_some_and(|s| s.completed.contains(id))
    }

    fn require_pending(&self, phase: Phase, id: &NodeId) -> Result<(), ProgressError> {
        if self.is_completed(phase, id) {
            Err(ProgressError::ArtifactAlreadyCompleted { phase, artifact_id: id.clone() })
        } else {
            Ok(())
        }
    }

    /// Suma el artifact a la barra agregada y lo marca como completado.
    fn count_completed(&mut self, phase: Phase, id: &NodeId) -> Result<(), ProgressError> {
        self.ensure_phase_bar(phase).increment(1)?;
        self.slot(phase).completed.insert(id.clone());
        Ok(())
    }

    fn start_artifact_bar(&mut self, phase: Phase, id: &NodeId, total: u64) -> Result<(), ProgressError> {
        let key = (id.clone(), phase);
        if self.artifact_bars.get(&key).is_some_and(TrackedBar::is_active) {
            return Err(ProgressError::DuplicateArtifactBar { phase, artifact_id: id.clone() });
        }
        let label = self.label_for(phase, id);
        let bar = match phase {
            Phase::Build => TrackedBar::spinner(&self.multi, &label),
            _ => TrackedBar::artifact(&self.multi, &label, total),
        };
        self.artifact_bars.insert(key, bar);
        Ok(())
    }

    fn artifact_bar(&mut self, phase: Phase, id: &NodeId) -> Result<&mut TrackedBar, ProgressError> {
        self.artifact_bars
            .get_mut(&(id.clone(), phase))
            .ok_or_else(|| ProgressError::ArtifactBarMissing { phase, artifact_id: id.clone() })
    }

    fn abort_artifact_bar(&mut self, phase: Phase, id: &NodeId) {
        if let Some(bar) = self.artifact_bars.get_mut(&(id.clone(), phase)) {
            bar.abort();
        }
    }

    fn abort_phase(&mut self, phase: Phase) {
        self.slot(phase).abort();
        for ((_, p), bar) in self.artifact_bars.iter_mut() {
            if *p == phase {
                bar.abort();
            }
        }
    }

    fn abort_all_active(&mut self) {
        for slot in self.phases.values_mut() {
            if let Some(bar) = slot.bar.as_mut() {
                bar.abort();
            }
        }
        for bar in self.artifact_bars.values_mut() {
            bar.abort();
        }
    }

    fn tick(&self) {
        for bar in self.phases.values().filter_map(|s| s.bar.as_ref()) {
            bar.tick();
        }
    }

    /// `current/total` de cada fase con barra, para diagnóstico.
    fn diagnostics(&self) -> String {
        Phase::ALL.iter()
                  .filter_map(|p| {
                      self.phases
                          .get(p)
                          .and_then(|s| s.bar.as_ref())
                          .map(|b| format!("{p}: {} out of {}", b.current(), b.total()))
                  })
                  .collect::<Vec<_>>()
                  .join(", ")
    }

    /// Tras un `Success`, cada fase con barra debe haber llegado a su total.
    fn verify_complete(&self) -> Result<(), ProgressError> {
        for phase in Phase::ALL {
            let Some(slot) = self.phases.get(&phase) else { continue };
            if slot.aborted {
                continue;
            }
            if let Some(bar) = slot.bar.as_ref() {
                if bar.current() < bar.total() {
                    return Err(ProgressError::PhaseIncomplete { phase, current: bar.current(), total: bar.total() });
                }
            }
        }
        Ok(())
    }

    fn apply(&mut self, event: &SetupEvent) -> Result<(), ProgressError> {
        if let SetupEvent::Start { artifacts_to_build, artifacts_to_download, artifacts_to_install, .. } = event {
            if self.started {
                return Err(ProgressError::DuplicateStart);
            }
            self.expected.insert(Phase::Build, artifacts_to_build.clone());
            self.expected.insert(Phase::Download, artifacts_to_download.clone());
            self.expected.insert(Phase::Install, artifacts_to_install.clone());
            self.started = true;
            if artifacts_to_build.is_empty() && artifacts_to_download.is_empty() && artifacts_to_install.is_empty() {
                debug!("setup started with nothing to build, download or install");
            }
            return Ok(());
        }
        if !self.started {
            return Err(ProgressError::EventBeforeStart { event: event.name() });
        }
        if let Some(phase) = event.phase() {
            if self.slot(phase).aborted {
                debug!("ignoring {} for aborted {phase} phase", event.name());
                return Ok(());
            }
        }

        use SetupEvent::*;
        match event {
            Start { .. } => Ok(()),
            Success => {
                self.success = true;
                Ok(())
            }
            Failure { message } => {
                debug!("setup failed: {message}");
                Ok(())
            }

            SolveStart => {
                if self.slot(Phase::Solve).bar.is_some() {
                    return Err(ProgressError::PhaseAlreadyStarted(Phase::Solve));
                }
                self.ensure_phase_bar(Phase::Solve);
                Ok(())
            }
            SolveSuccess => self.phase_bar(Phase::Solve)?.increment(1),
            SolveError { message } => {
                debug!("solve failed: {message}");
                self.slot(Phase::Solve).abort();
                Ok(())
            }

            BuildStarted { log_file_path } => {
                if self.build_started {
                    return Err(ProgressError::PhaseAlreadyStarted(Phase::Build));
                }
                self.build_started = true;
                if let Some(path) = log_file_path {
                    debug!("build log: {}", path.display());
                }
                self.ensure_phase_bar(Phase::Build);
                Ok(())
            }
            BuildSkipped => {
                if self.slot(Phase::Build).bar.is_some() {
                    return Err(ProgressError::BuildSkippedAfterStart);
                }
                debug!("build skipped");
                Ok(())
            }
            BuildSuccess => {
                if self.expected_total(Phase::Build) > 0 {
                    self.phase_bar(Phase::Build)?;
                }
                Ok(())
            }
            BuildFailure { message } => {
                debug!("build failed: {message}");
                for phase in [Phase::Build, Phase::Download, Phase::Install] {
                    self.abort_phase(phase);
                }
                Ok(())
            }

            ArtifactBuildStarted { artifact_id, from_cache } => {
                self.ensure_phase_bar(Phase::Build);
                if !self.is_expected(Phase::Build, artifact_id) {
                    warn!("build started for unexpected artifact {artifact_id}");
                    return Ok(());
                }
                debug!("artifact {artifact_id} build started (cached: {from_cache})");
                self.start_artifact_bar(Phase::Build, artifact_id, 1)
            }
            ArtifactBuildProgress { artifact_id, message } => {
                debug!("artifact {artifact_id}: {message}");
                Ok(())
            }
            ArtifactBuildSuccess { artifact_id, .. } => {
                self.ensure_phase_bar(Phase::Build);
                if !self.is_expected(Phase::Build, artifact_id) {
                    warn!("build succeeded for unexpected artifact {artifact_id}");
                    return Ok(());
                }
                if self.is_completed(Phase::Build, artifact_id) {
                    warn!("build success for {artifact_id} reported more than once");
                    return Ok(());
                }
                if let Some(bar) = self.artifact_bars.get_mut(&(artifact_id.clone(), Phase::Build)) {
                    bar.complete();
                }
                self.count_completed(Phase::Build, artifact_id)
            }
            ArtifactBuildFailure { artifact_id, message } => {
                warn!("artifact {artifact_id} failed to build: {message}");
                self.abort_artifact_bar(Phase::Build, artifact_id);
                Ok(())
            }

            ArtifactDownloadStarted { artifact_id, total_size } => {
                self.started_artifact(Phase::Download, artifact_id, *total_size)
            }
            ArtifactDownloadProgress { artifact_id, increment } => {
                self.artifact_bar(Phase::Download, artifact_id)?.increment(*increment)
            }
            ArtifactDownloadSkipped { artifact_id } => self.skipped_artifact(Phase::Download, artifact_id),
            ArtifactDownloadSuccess { artifact_id } => self.finished_artifact(Phase::Download, artifact_id),
            ArtifactDownloadFailure { artifact_id, message } => {
                warn!("artifact {artifact_id} failed to download: {message}");
                self.abort_artifact_bar(Phase::Download, artifact_id);
                Ok(())
            }

            ArtifactInstallStarted { artifact_id, total_size } => {
                self.started_artifact(Phase::Install, artifact_id, *total_size)
            }
            ArtifactInstallProgress { artifact_id, increment } => {
                self.artifact_bar(Phase::Install, artifact_id)?.increment(*increment)
            }
            ArtifactInstallSkipped { artifact_id } => self.skipped_artifact(Phase::Install, artifact_id),
            ArtifactInstallSuccess { artifact_id } => self.finished_artifact(Phase::Install, artifact_id),
            ArtifactInstallFailure { artifact_id, message } => {
                warn!("artifact {artifact_id} failed to install: {message}");
                self.abort_artifact_bar(Phase::Install, artifact_id);
                Ok(())
            }
        }
    }

    fn started_artifact(&mut self, phase: Phase, id: &NodeId, total: u64) -> Result<(), ProgressError> {
        self.require_expected(phase, id)?;
        self.require_pending(phase, id)?;
        self.ensure_phase_bar(phase);
        self.start_artifact_bar(phase, id, total)
    }

    fn skipped_artifact(&mut self, phase: Phase, id: &NodeId) -> Result<(), ProgressError> {
        self.require_expected(phase, id)?;
        self.require_pending(phase, id)?;
        self.count_completed(phase, id)
    }

    fn finished_artifact(&mut self, phase: Phase, id: &NodeId) -> Result<(), ProgressError> {
        self.require_expected(phase, id)?;
        self.require_pending(phase, id)?;
        self.artifact_bar(phase, id)?.complete();
        self.count_completed(phase, id)
    }
}

/// Implementación de `SetupEventHandler` que dibuja el progreso del setup.
pub struct ProgressDigester {
    state: Arc<Mutex<DigesterState>>,
    config: DigesterConfig,
    cancel: CancellationToken,
    done_rx: Mutex<Option<oneshot::Receiver<()>>>,
    render: Mutex<Option<JoinHandle<()>>>,
}

impl ProgressDigester {
    /// Crea el digester y lanza la tarea de render. Requiere un runtime de
    /// tokio activo.
    pub fn new(config: DigesterConfig) -> Result<Self, ProgressError> {
        let handle = tokio::runtime::Handle::try_current().map_err(|_| ProgressError::NoRuntime)?;
        let target = if config.hidden {
            ProgressDrawTarget::hidden()
        } else {
            ProgressDrawTarget::stderr()
        };
        let multi = MultiProgress::with_draw_target(target);
        let state = Arc::new(Mutex::new(DigesterState::new(multi, config.max_name_width)));
        let cancel = CancellationToken::new();
        let (done_tx, done_rx) = oneshot::channel();
        let render = handle.spawn(render_loop(state.clone(), cancel.clone(), done_tx, config.refresh_interval));
        Ok(Self { state, config, cancel, done_rx: Mutex::new(Some(done_rx)), render: Mutex::new(Some(render)) })
    }

    pub fn phase_state(&self, phase: Phase) -> PhaseState { self.state.lock().phase_state(phase) }

    /// `(current, total)` de la barra agregada, si existe.
    pub fn phase_progress(&self, phase: Phase) -> Option<(u64, u64)> {
        let st = self.state.lock();
        st.phases.get(&phase).and_then(|s| s.bar.as_ref()).map(|b| (b.current(), b.total()))
    }

    pub fn artifact_bar_state(&self, artifact_id: &NodeId, phase: Phase) -> Option<BarState> {
        self.state.lock().artifact_bars.get(&(artifact_id.clone(), phase)).map(TrackedBar::state)
    }

    /// Nombres de los eventos recibidos, en orden.
    pub fn event_log(&self) -> Vec<&'static str> { self.state.lock().log.clone() }

    pub fn succeeded(&self) -> bool { self.state.lock().success }

    /// Espera el render con timeout; si vence, lo cancela y sólo registra el
    /// estado. Si el pipeline reportó éxito, verifica que cada fase con barra
    /// llegó a su total.
    pub async fn close(&self) -> Result<(), ProgressError> {
        let done_rx = {
            let mut st = self.state.lock();
            if st.closing {
                return Err(ProgressError::Closed);
            }
            st.closing = true;
            if !st.success {
                st.abort_all_active();
            }
            self.done_rx.lock().take()
        };

        let flushed = match done_rx {
            Some(rx) => tokio::select! {
                res = rx => res.is_ok(),
                _ = tokio::time::sleep(self.config.close_timeout) => false,
            },
            None => false,
        };
        if !flushed {
            self.cancel.cancel();
            error!("timed out waiting for progress rendering to finish ({})", self.state.lock().diagnostics());
        }
        let render = self.render.lock().take();
        if let Some(render) = render {
            if let Err(e) = render.await {
                warn!("progress render task ended abnormally: {e}");
            }
        }

        let st = self.state.lock();
        if st.success {
            if let Err(e) = st.verify_complete() {
                error!("progress incomplete after success: {e} ({})", st.diagnostics());
                return Err(e);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SetupEventHandler for ProgressDigester {
    fn handle(&self, event: &SetupEvent) -> Result<(), ProgressError> {
        let mut st = self.state.lock();
        if st.closing {
            return Err(ProgressError::Closed);
        }
        st.log.push(event.name());
        let res = st.apply(event);
        if let Err(e) = &res {
            warn!("invariant violated by {}: {e}; events so far: {:?}", event.name(), st.log);
        }
        res
    }

    async fn close(&self) -> Result<(), ProgressError> { ProgressDigester::close(self).await }
}

impl Drop for ProgressDigester {
    fn drop(&mut self) { self.cancel.cancel(); }
}

async fn render_loop(state: Arc<Mutex<DigesterState>>,
                     cancel: CancellationToken,
                     done_tx: oneshot::Sender<()>,
                     refresh: std::time::Duration) {
    let mut ticker = tokio::time::interval(refresh);
    let mut done_tx = Some(done_tx);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("progress render cancelled");
                return;
            }
            _ = ticker.tick() => {
                let finished = {
                    let st = state.lock();
                    st.tick();
                    st.closing && st.active_bars() == 0
                };
                if finished {
                    if let Some(tx) = done_tx.take() {
                        let _ = tx.send(());
                    }
                    return;
                }
            }
        }
    }
}
