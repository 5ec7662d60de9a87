use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use circlefit::config::{DelayMode, FanoLeakage, FitConfig, PortType};
use circlefit::output::{FitOutput, OutputFormat, create_formatter};
use circlefit::{CircleFitter, Power, read_sweep};

#[derive(Parser, Debug)]
#[command(name = "circlefit")]
#[command(about = "Fit microwave resonator sweeps and extract quality factors", long_about = None)]
struct Args {
    /// Sweep files with `frequency re im` rows
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// TOML fit configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Measurement geometry
    #[arg(short, long, value_enum)]
    port: Option<PortType>,

    /// Cable delay: "auto" to estimate, or a value such as "50ns", "5e-8"
    #[arg(short, long)]
    delay: Option<DelayMode>,

    /// Background isolation in dB for the Fano range
    #[arg(long, conflicts_with = "fano_b")]
    isolation: Option<f64>,

    /// Relative background amplitude for the Fano range
    #[arg(long)]
    fano_b: Option<f64>,

    /// Skip the covariance-based parameter errors
    #[arg(long)]
    no_errors: bool,

    /// Drive power at the resonator in dBm, adds the photon number
    #[arg(long, allow_hyphen_values = true)]
    power_dbm: Option<f64>,

    /// Output format: text, json, csv
    #[arg(short = 'f', long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Increase output verbosity
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn build_config(args: &Args) -> Result<FitConfig> {
    let mut config = match args.config {
        Some(ref path) => FitConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => FitConfig::default(),
    };

    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(delay) = args.delay {
        config.delay = delay;
    }
    if let Some(db) = args.isolation {
        config.fano = FanoLeakage::IsolationDb(db);
    } else if let Some(b) = args.fano_b {
        config.fano = FanoLeakage::Amplitude(b);
    }
    if args.no_errors {
        config.calc_errors = false;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = build_config(&args)?;
    log::info!("port: {:?}, delay: {}", config.port, config.delay);
    let fitter = CircleFitter::new(config)?;

    let formatter = create_formatter(args.format, args.verbose > 0);
    if let Some(header) = formatter.header() {
        println!("{}", header);
    }

    let power = args.power_dbm.map(Power::from_dbm);
    let mut failures = 0;
    for path in &args.files {
        let source = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let fitted = read_sweep(path)
            .with_context(|| format!("Failed to read {}", path.display()))
            .and_then(|samples| {
                fitter
                    .fit(&samples, None)
                    .with_context(|| format!("Fit failed for {}", path.display()))
            });

        match fitted {
            Ok(result) => {
                let output = FitOutput {
                    source: &source,
                    result: &result,
                    power,
                };
                println!("{}", formatter.format(&output));
            }
            Err(e) => {
                eprintln!("{:#}", e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} sweeps failed", failures, args.files.len());
    }
    Ok(())
}
