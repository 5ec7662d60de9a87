pub mod calibrate;
pub mod circle;
pub mod delay;
pub mod fano;
pub mod lsq;
pub mod phase;
pub mod quality;

pub use calibrate::calibrate;
pub use circle::{Circle, fit_circle};
pub use delay::{DelayEstimate, estimate_delay, remove_delay};
pub use fano::fano_range;
pub use phase::{PhaseFit, PhaseGuess, fit_phase};
pub use quality::{QualityExtraction, extract_quality, quality_factors};
