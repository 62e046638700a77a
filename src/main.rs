use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use log::info;

use doppler_track::simulate::SimulatedRadio;
use doppler_track::{Acquisition, LogObserver, Result, Storable, TrackerConfig, Units};

#[derive(Parser)]
#[command(name = "doppler-track")]
#[command(about = "Radial velocity from the Doppler shift of a reflected tone")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a configuration file
    Validate { config: PathBuf },
    /// Track a simulated target through the loopback front-end
    Run(RunArgs),
}

#[derive(clap::Args)]
struct RunArgs {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Acquisition time, e.g. "10s" or "2min"
    #[arg(short, long, value_parser = humantime::parse_duration)]
    duration: Option<Duration>,
    #[arg(long)]
    center_freq: Option<f64>,
    #[arg(long)]
    sample_rate: Option<f64>,
    /// Radial velocity of the simulated target in m/s
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    target_velocity: f64,
    /// Receiver noise power per channel in dB
    #[arg(long, allow_hyphen_values = true)]
    noise_db: Option<f64>,
    /// Subtract the reference tone from the spectral peak
    #[arg(long)]
    compensate_tone: bool,
    /// Two-column velocity table
    #[arg(short, long, default_value = "doppler_velocity_data.csv")]
    output: PathBuf,
    /// Full sample records as JSON
    #[arg(long)]
    json: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { config } => validate(&config),
        Commands::Run(args) => run(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load(path: &Option<PathBuf>) -> Result<TrackerConfig> {
    match path {
        Some(path) => TrackerConfig::from_file(path),
        None => Ok(TrackerConfig::default()),
    }
}

fn validate(path: &Path) -> Result<()> {
    let config = TrackerConfig::from_file(path)?;
    config.validate()?;
    println!(
        "Configuration is valid: {} Hz carrier, {} S/s, {} point FFT, {:?}",
        config.center_freq, config.sample_rate, config.fft_size, config.geometry
    );
    Ok(())
}

fn run(args: RunArgs) -> Result<()> {
    let mut config = load(&args.config)?;
    if let Some(duration) = args.duration {
        config.duration_s = duration.as_secs_f64();
    }
    if let Some(center_freq) = args.center_freq {
        config.center_freq = center_freq;
    }
    if let Some(sample_rate) = args.sample_rate {
        config.sample_rate = sample_rate;
    }
    if args.compensate_tone {
        config.compensate_tone_offset = true;
    }

    let mut radio = SimulatedRadio::new(args.target_velocity).with_geometry(config.geometry);
    if let Some(noise) = args.noise_db {
        radio = radio.with_noise(noise.db());
    }

    let duration = config.duration();
    let series = Acquisition::new(&mut radio, config)?.run(duration, &mut LogObserver)?;

    series.save_csv(&args.output)?;
    info!("Wrote {} rows to {}", series.len(), args.output.display());

    if let Some(path) = args.json {
        series.to_file(&path)?;
        info!("Wrote sample records to {}", path.display());
    }
    Ok(())
}
