//! rtflow
//!
//! Fachada del workspace:
//! - `core`: build plan, clausuras runtime/buildtime, changesets.
//! - `progress`: eventos del setup y el digester de progreso.
//! - `setup`: orquestador del setup de runtime.
//! - `errors`: `AppError`, que agrupa los errores de cada crate.
//! - `pipeline`: actualización con el digester conectado.

pub mod errors;
pub mod pipeline;

pub use rt_core as core;
pub use rt_progress as progress;
pub use rt_setup as setup;

pub use errors::AppError;
pub use pipeline::update_with_progress;
