use rt_core::ResolveError;
use rt_progress::ProgressError;
use rt_setup::{ConfigError, HashCacheError, SetupError};
use thiserror::Error;

/// Error de nivel aplicación: agrupa los errores de cada crate.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Error de resolución: {0}")]
    Resolve(#[from] ResolveError),
    #[error("Error de progreso: {0}")]
    Progress(#[from] ProgressError),
    #[error("Error de setup: {0}")]
    Setup(#[from] SetupError),
    #[error("Error de configuración: {0}")]
    Config(#[from] ConfigError),
    #[error("Error de hash del runtime: {0}")]
    HashCache(#[from] HashCacheError),
    #[error("Error en IO: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Errores causados por la entrada del usuario (plataforma sin terminal,
    /// artifact con build fallido), no por un defecto interno.
    pub fn is_user_facing(&self) -> bool {
        match self {
            Self::Resolve(e) | Self::Setup(SetupError::Resolve(e)) => e.is_user_facing(),
            Self::Setup(SetupError::NoPlatformMatch { .. } | SetupError::ArtifactCachedBuildFailed { .. }) => true,
            Self::Config(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_variant_from() {
        let err: AppError = ResolveError::InvalidPlan("sin terminales".into()).into();
        assert!(err.to_string().starts_with("Error de resolución: "));
        assert!(!err.is_user_facing());
    }

    #[test]
    fn test_platform_mismatch_is_user_facing() {
        let setup: SetupError = ResolveError::NoMatchingPlatform { platform_id: "x".into(), available: vec![] }.into();
        let err: AppError = setup.into();
        assert!(matches!(err, AppError::Setup(SetupError::NoPlatformMatch { .. })));
        assert!(err.is_user_facing());
    }

    #[test]
    fn test_progress_variant_format() {
        let err: AppError = ProgressError::Closed.into();
        assert!(err.to_string().starts_with("Error de progreso: "));
    }
}
