mod noise;
mod sweep;

pub use noise::{
    AdditiveNoiseConfig, BackgroundConfig, NoiseConfig, PhaseNoiseConfig, apply_noise,
    generate_noisy_sweep,
};
pub use sweep::{ResonatorModel, SweepConfig};
