//! Systematic Q uncertainty from Fano interference.
//!
//! An unaccounted background path of relative amplitude b interferes with
//! the resonant signal and tilts the circle. The measured mismatch angle φ
//! bounds how much of the apparent radius can be an artefact of that
//! interference. Cf. Rieger, Guenzler et al., arXiv:2209.03036.

use crate::config::FanoLeakage;
use crate::result::{FanoRange, FitWarning};

/// Worst-case Qc and Qi range for an assumed background leakage
///
/// Returns NaN bounds and a warning when sin φ exceeds the rescaled
/// background amplitude. `Qi_max` is infinite once the upper radius bound
/// reaches the physical limit 1/n.
pub fn fano_range(
    phi: f64,
    r0_norm: f64,
    ql: f64,
    n_ports: f64,
    leakage: FanoLeakage,
) -> (FanoRange, Option<FitWarning>) {
    let b = leakage.amplitude();
    let b = b / (1.0 - b);
    let sin_phi = phi.sin();

    if sin_phi > b {
        let warning = FitWarning::FanoLeakageExceeded { sin_phi, b };
        log::warn!("{}", warning);
        let range = FanoRange {
            b,
            qc_min: f64::NAN,
            qc_max: f64::NAN,
            qi_min: f64::NAN,
            qi_max: f64::NAN,
        };
        return (range, Some(warning));
    }

    let r_mid = r0_norm * phi.cos();
    let r_err = r0_norm * (b * b - sin_phi * sin_phi).abs().sqrt();
    let r_min = r_mid - r_err;
    let r_max = r_mid + r_err;

    let qi_max = if r_max >= 1.0 / n_ports {
        f64::INFINITY
    } else {
        ql / (1.0 - n_ports * r_max)
    };
    let range = FanoRange {
        b,
        qc_min: ql / (n_ports * r_max),
        qc_max: ql / (n_ports * r_min),
        qi_min: ql / (1.0 - n_ports * r_min),
        qi_max,
    };
    log::info!(
        "Fano range (b = {:.4}): Qc {:.1}..{:.1}, Qi {:.1}..{:.1}",
        range.b,
        range.qc_min,
        range.qc_max,
        range.qi_min,
        range.qi_max
    );
    (range, None)
}
