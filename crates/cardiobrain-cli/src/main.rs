//! CardioBrain command line: single-recording analysis, ECG/EEG correlation
//! and synthetic recording generation

mod format;
mod service;

use anyhow::{Context, Result};
use cardiobrain_core::Modality;
use cardiobrain_processing::ProcessingConfig;
use clap::{Parser, Subcommand, ValueEnum};
use service::{AnalysisService, CorrelateRequest};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "cardiobrain", version, about = "ECG/EEG feature extraction and correlation")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use the 60 Hz powerline preset when no configuration file is given
    #[arg(long, global = true)]
    mains_60hz: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze one recording and write its features as JSON
    Process {
        /// Recording to analyze (.csv, .txt or .edf)
        #[arg(short, long)]
        file: PathBuf,
        /// Signal type of the recording
        #[arg(short = 't', long = "type", value_enum)]
        kind: SignalKind,
        /// Output JSON file
        #[arg(short, long)]
        output: PathBuf,
        /// Sampling rate for files that do not carry one
        #[arg(short, long)]
        sampling_rate: Option<f64>,
        /// Processing configuration JSON
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Correlate two stored analyses described by a request file
    Correlate {
        /// Request JSON with ecgAnalysisId, eegAnalysisId, outputPath and optional resultsDir;
        /// analyses default to `results/` beside the request file's directory
        #[arg(short, long)]
        config: PathBuf,
        /// Processing configuration JSON
        #[arg(long)]
        processing_config: Option<PathBuf>,
    },
    /// Analyze an ECG and an EEG recording and correlate them
    Analyze {
        /// ECG recording
        #[arg(long)]
        ecg: PathBuf,
        /// EEG recording
        #[arg(long)]
        eeg: PathBuf,
        /// Directory receiving both analyses and correlation.json
        #[arg(short, long, default_value = "results")]
        output_dir: PathBuf,
        /// Sampling rate for CSV/TXT recordings; EDF files keep their header rate
        #[arg(long)]
        default_sampling_rate: Option<f64>,
        /// Processing configuration JSON
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Write a synthetic recording as CSV
    Simulate {
        #[arg(short = 't', long = "type", value_enum)]
        kind: SignalKind,
        /// Duration in seconds
        #[arg(short, long, default_value_t = 10.0)]
        duration: f64,
        #[arg(short, long, default_value_t = 1000.0)]
        sampling_rate: f64,
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SignalKind {
    Ecg,
    Eeg,
}

impl From<SignalKind> for Modality {
    fn from(kind: SignalKind) -> Self {
        match kind {
            SignalKind::Ecg => Modality::Ecg,
            SignalKind::Eeg => Modality::Eeg,
        }
    }
}

fn load_config(path: Option<&Path>, mains_60hz: bool) -> Result<ProcessingConfig> {
    let Some(path) = path else {
        return Ok(if mains_60hz { ProcessingConfig::mains_60hz() } else { ProcessingConfig::default() });
    };
    let json = std::fs::read_to_string(path).with_context(|| format!("Cannot read config {}", path.display()))?;
    ProcessingConfig::from_json(&json).with_context(|| format!("Invalid config {}", path.display()))
}

async fn run(cli: Cli) -> Result<()> {
    let mains_60hz = cli.mains_60hz;
    match cli.command {
        Command::Process { file, kind, output, sampling_rate, config } => {
            let service = AnalysisService::new(load_config(config.as_deref(), mains_60hz)?)?;
            let result = service.process_file(&file, kind.into(), &output, sampling_rate).await?;
            info!(
                "{} features computed, {} diagnostics",
                result.features().len(),
                result.diagnostics().len()
            );
        }
        Command::Correlate { config, processing_config } => {
            let request = CorrelateRequest::load(&config).await?;
            let service = AnalysisService::new(load_config(processing_config.as_deref(), mains_60hz)?)?;
            let report = service.correlate_stored(&request).await?;
            info!("Phase locking {:?}", report.frequency_domain.phase_locking_status);
        }
        Command::Analyze { ecg, eeg, output_dir, default_sampling_rate, config } => {
            let mut config = load_config(config.as_deref(), mains_60hz)?;
            if let Some(rate) = default_sampling_rate {
                config.ingest.default_sampling_rate = rate;
            }
            let service = AnalysisService::new(config)?;
            let outcome = service.analyze_pair(&ecg, &eeg, &output_dir).await?;
            println!("ECG analysis: {}", outcome.ecg_id);
            println!("EEG analysis: {}", outcome.eeg_id);
        }
        Command::Simulate { kind, duration, sampling_rate, output } => {
            let modality = Modality::from(kind);
            let rows = tokio::task::spawn_blocking(move || {
                service::write_simulation(modality, duration, sampling_rate, &output)
            })
            .await??;
            info!("Wrote {} samples of simulated {}", rows, modality);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
