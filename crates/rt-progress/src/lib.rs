//! rt-progress: eventos del setup de runtime y digester de progreso.
pub mod bar;
pub mod config;
pub mod digester;
pub mod errors;
pub mod events;
pub mod handler;
pub mod solve;

pub use bar::{BarState, TrackedBar};
pub use config::DigesterConfig;
pub use digester::{PhaseState, ProgressDigester};
pub use errors::ProgressError;
pub use events::{ArtifactNames, Phase, SetupEvent, SetupEventRecord};
pub use handler::{EventMultiplexer, RecordingHandler, SetupEventHandler, VoidHandler};
pub use solve::SolveSpinner;
