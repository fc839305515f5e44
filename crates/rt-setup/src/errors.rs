//! Errores del setup de runtime.

use std::io;

use rt_core::{ArtifactStatus, NodeId, ResolveError};
use rt_progress::ProgressError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("no build plan terminal matches platform '{platform_id}' (available: {available:?})")]
    NoPlatformMatch { platform_id: String, available: Vec<String> },
    #[error("could not resolve build plan: {0}")]
    Resolve(ResolveError),
    #[error("solve failed: {0}")]
    Solve(String),
    #[error("artifact '{name}' ({artifact_id}) has a cached build failure, status: {status}")]
    ArtifactCachedBuildFailed { artifact_id: NodeId, name: String, status: ArtifactStatus },
    #[error("build failed: {0}")]
    BuildFailed(String),
    #[error("download of {artifact_id} failed: {message}")]
    Download { artifact_id: NodeId, message: String },
    #[error("install of {artifact_id} failed: {message}")]
    Install { artifact_id: NodeId, message: String },
    #[error("artifact {0} is not present in the depot")]
    MissingPayload(NodeId),
    #[error("progress: {0}")]
    Progress(#[from] ProgressError),
    #[error("runtime hash: {0}")]
    HashCache(#[from] HashCacheError),
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("worker: {0}")]
    Worker(String),
}

impl From<ResolveError> for SetupError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::NoMatchingPlatform { platform_id, available } => Self::NoPlatformMatch { platform_id, available },
            other => Self::Resolve(other),
        }
    }
}

#[derive(Debug, Error)]
pub enum HashCacheError {
    #[error("io error on {path}: {source}")]
    Io { path: String, source: io::Error },
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}: {reason}")]
    Invalid { key: &'static str, value: String, reason: String },
}
