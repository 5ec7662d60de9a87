use super::{FitOutput, Formatter, iso8601_timestamp};

pub struct CsvFormatter;

fn optional(value: Option<f64>) -> String {
    value.map_or(String::new(), |v| format!("{:e}", v))
}

impl Formatter for CsvFormatter {
    fn format(&self, output: &FitOutput) -> String {
        let r = output.result;
        let cal = &r.calibration;
        let q = &r.quality;
        let e = r.errors.as_ref();
        format!(
            "{},{},{:.3},{:.4},{:.4},{:.4},{:.4},{:.4},{:.8},{:.8},{:.8},{:.8},{:e},{:e},{:.3},{:e},{},{},{},{},{},{},{:.4},{:.4},{:.4},{:.4},{},{}",
            iso8601_timestamp(),
            output.source,
            cal.fr,
            cal.ql,
            q.qc,
            q.qc_abs,
            q.qi,
            q.qi_no_dia_corr,
            cal.phi,
            cal.a,
            cal.alpha,
            cal.theta,
            cal.delay,
            cal.delay_remaining,
            cal.snr,
            q.chi_square,
            optional(e.map(|e| e.fr_err)),
            optional(e.map(|e| e.ql_err)),
            optional(e.map(|e| e.qc_abs_err)),
            optional(e.map(|e| e.phi_err)),
            optional(e.map(|e| e.qi_err)),
            optional(e.map(|e| e.qi_no_dia_corr_err)),
            r.fano.qc_min,
            r.fano.qc_max,
            r.fano.qi_min,
            r.fano.qi_max,
            optional(output.photons()),
            r.warnings.len()
        )
    }

    fn header(&self) -> Option<&'static str> {
        Some(
            "ts,source,fr,Ql,Qc,Qc_abs,Qi,Qi_no_dia_corr,phi,a,alpha,theta,delay,delay_remaining,SNR,chi_square,fr_err,Ql_err,Qc_abs_err,phi_err,Qi_err,Qi_no_dia_corr_err,Qc_min,Qc_max,Qi_min,Qi_max,photons,warnings",
        )
    }
}
