use serde::Serialize;

use super::{FitOutput, Formatter, iso8601_timestamp};
use crate::result::FitResult;

pub struct JsonFormatter;

#[derive(Serialize)]
struct JsonRecord<'a> {
    ts: String,
    source: &'a str,
    #[serde(flatten)]
    result: &'a FitResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    photons: Option<f64>,
}

impl Formatter for JsonFormatter {
    fn format(&self, output: &FitOutput) -> String {
        let record = JsonRecord {
            ts: iso8601_timestamp(),
            source: output.source,
            result: output.result,
            photons: output.photons(),
        };
        // Non-finite floats serialize as null
        serde_json::to_string(&record)
            .unwrap_or_else(|e| format!(r#"{{"source":"{}","error":"{}"}}"#, output.source, e))
    }
}
