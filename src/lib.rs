pub mod config;
pub mod constants;
pub mod error;
pub mod fit;
pub mod model;
pub mod numeric;
pub mod output;
pub mod processing;
pub mod result;
pub mod sweep_file;

#[cfg(feature = "simulation")]
pub mod simulation;

pub use config::{DelayMode, FanoLeakage, FitConfig, PortType};
pub use error::{FitError, Result};
pub use model::{ResonatorParams, Sample, samples_from_columns};
pub use processing::CircleFitter;
pub use result::{FitResult, FitWarning, Power};
pub use sweep_file::{parse_sweep, read_sweep, write_sweep};
