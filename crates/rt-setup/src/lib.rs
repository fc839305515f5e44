//! Setup de runtime: orquesta solve, build, descarga e instalación de la
//! clausura runtime de un build plan, emitiendo `SetupEvent`s.
pub mod collaborators;
pub mod config;
pub mod depot;
pub mod errors;
pub mod hash;
pub mod orchestrator;
pub mod sim;

pub use collaborators::{BuildMonitor, Downloader, Installer, ProgressReport, SetupRequest, Solver};
pub use config::{init_dotenv, SetupConfig};
pub use depot::Depot;
pub use errors::{ConfigError, HashCacheError, SetupError};
pub use hash::RuntimeHashCache;
pub use orchestrator::{RuntimeSetup, SetupOutcome, SetupPlan, SetupSummary};
pub use sim::SimulatedBackend;
