use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use circlefit::config::PortType;
use circlefit::simulation::{NoiseConfig, ResonatorModel, SweepConfig, generate_noisy_sweep};
use circlefit::write_sweep;

#[derive(Parser, Debug)]
#[command(name = "generate_sweep")]
#[command(about = "Generate synthetic resonator sweeps for testing the circle fit")]
struct Args {
    /// TOML file with [resonator], [sweep] and [noise] sections
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output file (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Resonance frequency in Hz
    #[arg(long)]
    fr: Option<f64>,

    /// Loaded quality factor
    #[arg(long)]
    ql: Option<f64>,

    /// Coupling quality factor (diameter corrected)
    #[arg(long)]
    qc: Option<f64>,

    /// Impedance mismatch angle in radians
    #[arg(long, allow_hyphen_values = true)]
    phi: Option<f64>,

    /// Cable delay in seconds
    #[arg(long)]
    delay: Option<f64>,

    /// Measurement geometry
    #[arg(short, long, value_enum)]
    port: Option<PortType>,

    /// Number of frequency points
    #[arg(short = 'n', long)]
    points: Option<usize>,

    /// Frequency span in Hz, centered on fr
    #[arg(long)]
    span: Option<f64>,

    /// Complex Gaussian noise per quadrature (CLI override)
    #[arg(long)]
    sigma: Option<f64>,

    /// Seed for reproducibility
    #[arg(short, long)]
    seed: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct TomlConfig {
    resonator: ResonatorModel,
    sweep: Option<SweepConfig>,
    noise: NoiseConfig,
}

fn load_toml_config(path: &PathBuf) -> Result<TomlConfig> {
    let content = fs::read_to_string(path).context("Failed to read config file")?;
    toml::from_str(&content).context("Failed to parse config file")
}

fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = match args.config {
        Some(ref path) => load_toml_config(path)?,
        None => TomlConfig::default(),
    };

    let mut model = toml_config.resonator;
    model.fr = args.fr.unwrap_or(model.fr);
    model.ql = args.ql.unwrap_or(model.ql);
    model.qc = args.qc.unwrap_or(model.qc);
    model.phi = args.phi.unwrap_or(model.phi);
    model.delay = args.delay.unwrap_or(model.delay);
    model.port = args.port.unwrap_or(model.port);

    let mut sweep = toml_config
        .sweep
        .unwrap_or_else(|| SweepConfig::centered(model.fr, 0.04 * model.fr, 401));
    if let Some(span) = args.span {
        let points = args.points.unwrap_or(sweep.points);
        sweep = SweepConfig::centered(model.fr, span, points);
    } else if let Some(points) = args.points {
        sweep.points = points;
    }

    let mut noise = toml_config.noise;
    if let Some(sigma) = args.sigma {
        noise = noise.with_additive(sigma);
    }
    if let Some(seed) = args.seed {
        noise = noise.with_seed(seed);
    }

    let samples = generate_noisy_sweep(&model, &sweep.frequencies(), &noise)
        .context("Failed to generate sweep")?;

    match args.output {
        Some(ref path) => {
            let file = fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            write_sweep(&mut writer, &samples)?;
            writer.flush()?;
            eprintln!(
                "Wrote {} points to {} (Qi = {:.1})",
                samples.len(),
                path.display(),
                model.qi()
            );
        }
        None => {
            let stdout = io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            write_sweep(&mut writer, &samples)?;
            writer.flush()?;
        }
    }

    Ok(())
}
