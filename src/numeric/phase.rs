use std::f64::consts::PI;

const TWO_PI: f64 = 2.0 * PI;

/// Map an arbitrary angle to the interval [-π, π)
///
/// Angles already inside the interval are returned untouched, which makes the
/// mapping exactly idempotent.
pub fn periodic_boundary(angle: f64) -> f64 {
    if (-PI..PI).contains(&angle) {
        return angle;
    }
    let wrapped = (angle + PI).rem_euclid(TWO_PI) - PI;
    // rem_euclid may round up to the modulus for inputs just below a multiple
    if wrapped >= PI { -PI } else { wrapped }
}

/// Unwrap a phase sequence by removing jumps larger than π
///
/// Each successive difference is reduced to [-π, π) and accumulated, so the
/// output differs from the input by whole multiples of 2π per sample.
pub fn unwrap_phase(phase: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(phase.len());
    let Some(&first) = phase.first() else {
        return out;
    };
    out.push(first);

    let mut correction = 0.0;
    for pair in phase.windows(2) {
        let diff = pair[1] - pair[0];
        if diff.abs() < PI {
            out.push(pair[1] + correction);
            continue;
        }
        let mut wrapped = periodic_boundary(diff);
        // A jump of exactly +π stays +π rather than flipping to -π
        if wrapped == -PI && diff > 0.0 {
            wrapped = PI;
        }
        correction += wrapped - diff;
        out.push(pair[1] + correction);
    }
    out
}
