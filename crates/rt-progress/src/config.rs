//! Configuración explícita del digester.

use std::time::Duration;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(150);
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_NAME_WIDTH: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigesterConfig {
    /// Periodo de la tarea de render.
    pub refresh_interval: Duration,
    /// Espera máxima en `close` antes de cancelar el render.
    pub close_timeout: Duration,
    /// Dibujar hacia un destino oculto (tests, salida no interactiva).
    pub hidden: bool,
    pub max_name_width: usize,
}

impl Default for DigesterConfig {
    fn default() -> Self {
        Self { refresh_interval: DEFAULT_REFRESH_INTERVAL,
               close_timeout: DEFAULT_CLOSE_TIMEOUT,
               hidden: false,
               max_name_width: DEFAULT_MAX_NAME_WIDTH }
    }
}

impl DigesterConfig {
    pub fn hidden() -> Self { Self { hidden: true, ..Self::default() } }
}
