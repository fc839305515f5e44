//! Configuración del setup: objeto explícito que se pasa al construir el
//! orquestador. Se puede cargar de variables de entorno (y `.env`).

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use dotenvy::dotenv;
use once_cell::sync::Lazy;
use rt_progress::DigesterConfig;

use crate::errors::ConfigError;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

pub const ENV_MAX_CONCURRENCY: &str = "RTFLOW_MAX_CONCURRENCY";
pub const ENV_STATE_DIR: &str = "RTFLOW_STATE_DIR";
pub const ENV_REFRESH_MS: &str = "RTFLOW_REFRESH_MS";
pub const ENV_CLOSE_TIMEOUT_MS: &str = "RTFLOW_CLOSE_TIMEOUT_MS";
pub const ENV_HIDE_PROGRESS: &str = "RTFLOW_HIDE_PROGRESS";

pub const DEFAULT_MAX_CONCURRENCY: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupConfig {
    /// Descargas/instalaciones simultáneas como máximo.
    pub max_concurrency: usize,
    /// Directorio del runtime; el hash cache vive en `<dir>/.rtflow/`.
    pub state_dir: PathBuf,
    pub digester: DigesterConfig,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self { max_concurrency: DEFAULT_MAX_CONCURRENCY, state_dir: PathBuf::from("."), digester: DigesterConfig::default() }
    }
}

impl SetupConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Lazy::force(&DOTENV_LOADED);
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Igual que `from_env` pero leyendo de una función arbitraria.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();
        if let Some(n) = parse::<usize>(&get, ENV_MAX_CONCURRENCY)? {
            if n == 0 {
                return Err(ConfigError::Invalid { key: ENV_MAX_CONCURRENCY,
                                                  value: "0".into(),
                                                  reason: "must be at least 1".into() });
            }
            cfg.max_concurrency = n;
        }
        if let Some(dir) = get(ENV_STATE_DIR).filter(|d| !d.trim().is_empty()) {
            cfg.state_dir = PathBuf::from(dir);
        }
        if let Some(ms) = parse::<u64>(&get, ENV_REFRESH_MS)? {
            cfg.digester.refresh_interval = Duration::from_millis(ms.max(1));
        }
        if let Some(ms) = parse::<u64>(&get, ENV_CLOSE_TIMEOUT_MS)? {
            cfg.digester.close_timeout = Duration::from_millis(ms);
        }
        if let Some(hide) = get(ENV_HIDE_PROGRESS) {
            cfg.digester.hidden = parse_bool(ENV_HIDE_PROGRESS, &hide)?;
        }
        Ok(cfg)
    }

    pub fn with_state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.state_dir = dir.into();
        self
    }
}

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() { Lazy::force(&DOTENV_LOADED); }

fn parse<T>(get: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<T>, ConfigError>
    where T: FromStr,
          T::Err: std::fmt::Display
{
    match get(key) {
        None => Ok(None),
        Some(raw) => raw.trim()
                        .parse::<T>()
                        .map(Some)
                        .map_err(|e| ConfigError::Invalid { key, value: raw.clone(), reason: e.to_string() }),
    }
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::Invalid { key, value: raw.to_string(), reason: "expected a boolean".into() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn absent_values_take_defaults() {
        let cfg = SetupConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg, SetupConfig::default());
    }

    #[test]
    fn reads_every_variable() {
        let cfg = SetupConfig::from_lookup(lookup(&[(ENV_MAX_CONCURRENCY, "8"),
                                                     (ENV_STATE_DIR, "/tmp/rt"),
                                                     (ENV_REFRESH_MS, "50"),
                                                     (ENV_CLOSE_TIMEOUT_MS, "2500"),
                                                     (ENV_HIDE_PROGRESS, "yes")])).unwrap();
        assert_eq!(cfg.max_concurrency, 8);
        assert_eq!(cfg.state_dir, PathBuf::from("/tmp/rt"));
        assert_eq!(cfg.digester.refresh_interval, Duration::from_millis(50));
        assert_eq!(cfg.digester.close_timeout, Duration::from_millis(2500));
        assert!(cfg.digester.hidden);
    }

    #[test]
    fn malformed_values_are_config_errors() {
        let err = SetupConfig::from_lookup(lookup(&[(ENV_MAX_CONCURRENCY, "many")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: ENV_MAX_CONCURRENCY, .. }));
        assert!(SetupConfig::from_lookup(lookup(&[(ENV_MAX_CONCURRENCY, "0")])).is_err());
        assert!(SetupConfig::from_lookup(lookup(&[(ENV_HIDE_PROGRESS, "maybe")])).is_err());
    }
}
