//! Errores del digester y de los handlers de eventos.
//!
//! Las violaciones de invariantes se devuelven desde `handle`, nunca como
//! panic: el llamador decide si registrar y seguir o abortar la fase.

use rt_core::NodeId;
use thiserror::Error;

use crate::events::Phase;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ProgressError {
    #[error("received {event} before Start")]
    EventBeforeStart { event: &'static str },
    #[error("Start received more than once")]
    DuplicateStart,
    #[error("{0} phase already started")]
    PhaseAlreadyStarted(Phase),
    #[error("{0} phase has not started")]
    PhaseNotStarted(Phase),
    #[error("build was skipped after the build bar was created")]
    BuildSkippedAfterStart,
    #[error("artifact {artifact_id} is not expected in the {phase} phase")]
    UnexpectedArtifact { phase: Phase, artifact_id: NodeId },
    #[error("no {phase} bar for artifact {artifact_id}")]
    ArtifactBarMissing { phase: Phase, artifact_id: NodeId },
    #[error("{phase} bar for artifact {artifact_id} already exists")]
    DuplicateArtifactBar { phase: Phase, artifact_id: NodeId },
    #[error("artifact {artifact_id} already completed the {phase} phase")]
    ArtifactAlreadyCompleted { phase: Phase, artifact_id: NodeId },
    #[error("solve still running when Start arrived")]
    SolveInProgress,
    #[error("bar '{label}' overflow: {current} + {increment} exceeds total {total}")]
    Overflow { label: String, current: u64, total: u64, increment: u64 },
    #[error("bar '{label}' is no longer active")]
    BarNotActive { label: String },
    #[error("{phase} phase incomplete: {current} out of {total}")]
    PhaseIncomplete { phase: Phase, current: u64, total: u64 },
    #[error("digester already closed")]
    Closed,
    #[error("no async runtime available for progress rendering")]
    NoRuntime,
    #[error("event handler error: {0}")]
    Handler(String),
}
