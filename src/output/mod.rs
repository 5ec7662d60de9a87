mod csv;
mod json;
mod text;

use chrono::Utc;

use crate::result::{FitResult, Power};

pub use self::csv::CsvFormatter;
pub use self::json::JsonFormatter;
pub use self::text::TextFormatter;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

/// One fitted sweep as handed to a formatter
pub struct FitOutput<'a> {
    /// Where the sweep came from, usually the input file name
    pub source: &'a str,
    pub result: &'a FitResult,
    /// Drive power at the resonator, enables the photon number columns
    pub power: Option<Power>,
}

impl FitOutput<'_> {
    pub fn photons(&self) -> Option<f64> {
        self.power
            .map(|p| self.result.photons_in_resonator(p, false))
    }
}

pub trait Formatter: Send {
    fn format(&self, output: &FitOutput) -> String;

    fn header(&self) -> Option<&'static str> {
        None
    }
}

pub fn create_formatter(format: OutputFormat, verbose: bool) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter::new(verbose)),
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Csv => Box::new(CsvFormatter),
    }
}

pub fn iso8601_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}
