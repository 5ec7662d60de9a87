use std::fmt::Write;

use super::{FitOutput, Formatter};

pub struct TextFormatter {
    verbose: bool,
}

impl TextFormatter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

fn with_error(value: f64, error: Option<f64>) -> String {
    match error {
        Some(e) => format!("{:.2} ± {:.2}", value, e),
        None => format!("{:.2}", value),
    }
}

impl Formatter for TextFormatter {
    fn format(&self, output: &FitOutput) -> String {
        let r = output.result;
        let cal = &r.calibration;
        let q = &r.quality;

        if !self.verbose {
            return format!(
                "{}: fr: {:.6} GHz  Ql: {:.1}  Qc: {:.1}  Qi: {:.1}  phi: {:.4} rad",
                output.source,
                cal.fr * 1e-9,
                cal.ql,
                q.qc,
                q.qi,
                cal.phi
            );
        }

        let errors = r.errors.as_ref();
        let mut s = String::new();
        // Writing into a String cannot fail
        let _ = writeln!(s, "{} ({:?}, {} ports)", output.source, r.port, r.n_ports);
        let _ = writeln!(
            s,
            "  fr:             {} Hz",
            with_error(cal.fr, errors.map(|e| e.fr_err))
        );
        let _ = writeln!(s, "  Ql:             {}", with_error(cal.ql, errors.map(|e| e.ql_err)));
        let _ = writeln!(s, "  Qc:             {:.2}", q.qc);
        let _ = writeln!(
            s,
            "  |Qc|:           {}",
            with_error(q.qc_abs, errors.map(|e| e.qc_abs_err))
        );
        let _ = writeln!(s, "  Qi:             {}", with_error(q.qi, errors.map(|e| e.qi_err)));
        let _ = writeln!(
            s,
            "  Qi (no corr.):  {}",
            with_error(q.qi_no_dia_corr, errors.map(|e| e.qi_no_dia_corr_err))
        );
        let _ = writeln!(
            s,
            "  phi:            {:.6}{} rad",
            cal.phi,
            errors.map_or(String::new(), |e| format!(" ± {:.6}", e.phi_err))
        );
        let _ = writeln!(
            s,
            "  a: {:.6}  alpha: {:.6} rad  theta: {:.6} rad",
            cal.a, cal.alpha, cal.theta
        );
        let _ = writeln!(
            s,
            "  delay: {:.4} ns (remaining {:.3e} s){}",
            cal.delay * 1e9,
            cal.delay_remaining,
            r.delay_iterations
                .map_or(String::new(), |n| format!(", estimated in {} iterations", n))
        );
        let _ = writeln!(
            s,
            "  r0: {:.6}  r0_norm: {:.6}  SNR: {:.1}  chi²: {:.3e}",
            cal.r0, cal.r0_norm, cal.snr, q.chi_square
        );
        if r.fano.is_valid() {
            let _ = writeln!(
                s,
                "  Fano (b = {:.4}): Qc {:.1} .. {:.1}, Qi {:.1} .. {:.1}",
                r.fano.b, r.fano.qc_min, r.fano.qc_max, r.fano.qi_min, r.fano.qi_max
            );
        }
        if let (Some(power), Some(photons)) = (output.power, output.photons()) {
            let _ = writeln!(
                s,
                "  photons at {}: {:.3e} (single photon limit {})",
                power,
                photons,
                r.single_photon_limit(false)
            );
        }
        for warning in &r.warnings {
            let _ = writeln!(s, "  warning: {}", warning);
        }
        s.trim_end().to_string()
    }
}
