//! Plain-text sweep files.
//!
//! One sample per line: `frequency re im`, separated by whitespace or commas.
//! Blank lines and anything after `#` are ignored.

use std::io::Write;
use std::path::Path;

use num_complex::Complex64;

use crate::error::{FitError, Result};
use crate::model::Sample;

pub fn parse_sweep(text: &str) -> Result<Vec<Sample>> {
    let mut samples = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let content = line.split('#').next().unwrap_or("").trim();
        if content.is_empty() {
            continue;
        }
        let fields: Vec<&str> = content
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|f| !f.is_empty())
            .collect();
        if fields.len() != 3 {
            return Err(FitError::Parse {
                line: index + 1,
                message: format!("expected 3 columns, found {}", fields.len()),
            });
        }
        let mut values = [0.0; 3];
        for (value, field) in values.iter_mut().zip(&fields) {
            *value = field.parse().map_err(|_| FitError::Parse {
                line: index + 1,
                message: format!("invalid number '{}'", field),
            })?;
        }
        samples.push(Sample::new(values[0], Complex64::new(values[1], values[2])));
    }
    Ok(samples)
}

pub fn read_sweep(path: impl AsRef<Path>) -> Result<Vec<Sample>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|e| FitError::Io(format!("{}: {}", path.display(), e)))?;
    parse_sweep(&text)
}

pub fn write_sweep<W: Write>(writer: &mut W, samples: &[Sample]) -> Result<()> {
    let io = |e: std::io::Error| FitError::Io(e.to_string());
    writeln!(writer, "# frequency_hz re im").map_err(io)?;
    for s in samples {
        writeln!(writer, "{:.6} {:.12e} {:.12e}", s.frequency, s.value.re, s.value.im).map_err(io)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_separators() {
        let text = "# header\n4.9e9, 0.5, -0.25\n\n5.0e9 0.1\t0.2  # comment\n";
        let samples = parse_sweep(text).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].frequency, 4.9e9);
        assert_eq!(samples[0].value, Complex64::new(0.5, -0.25));
        assert_eq!(samples[1].value, Complex64::new(0.1, 0.2));
    }

    #[test]
    fn test_parse_errors_report_line() {
        assert_eq!(
            parse_sweep("1 2 3\n4 5\n"),
            Err(FitError::Parse {
                line: 2,
                message: "expected 3 columns, found 2".into()
            })
        );
        assert!(matches!(
            parse_sweep("1 x 3"),
            Err(FitError::Parse { line: 1, .. })
        ));
    }

    #[test]
    fn test_written_sweep_parses_back() {
        let samples = vec![
            Sample::new(5e9, Complex64::new(0.25, -0.5)),
            Sample::new(5.1e9, Complex64::new(1.0, 0.0)),
        ];
        let mut buffer = Vec::new();
        write_sweep(&mut buffer, &samples).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(parse_sweep(&text).unwrap(), samples);
    }
}
