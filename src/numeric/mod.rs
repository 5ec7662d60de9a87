pub mod phase;
pub mod smoothing;
pub mod stats;

pub use phase::{periodic_boundary, unwrap_phase};
pub use smoothing::{gaussian_filter, gradient};
pub use stats::{argmax_abs, linear_slope, mean, std_dev};
