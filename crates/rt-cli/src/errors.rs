use std::io;
use std::path::PathBuf;

use rt_core::ResolveError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("could not read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("could not write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("invalid build plan: {0}")]
    Plan(#[source] ResolveError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no platform given: pass --platform or set RTFLOW_PLATFORM_ID")]
    MissingPlatform,
    #[error("prefix '{prefix}' matches several artifacts: {}", .matches.join(", "))]
    Ambiguous { prefix: String, matches: Vec<String> },
    #[error("no artifact matches '{0}'")]
    NotFound(String),
    #[error("unsupported artifact url '{0}' (only file:// and local paths)")]
    UnsupportedUrl(String),
}

impl CliError {
    /// Código de salida del proceso.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Ambiguous { .. } => 2,
            Self::NotFound(_) => 3,
            Self::MissingPlatform | Self::UnsupportedUrl(_) => 4,
            _ => 1,
        }
    }
}
