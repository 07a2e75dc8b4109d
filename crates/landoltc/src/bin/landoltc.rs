//! landoltc CLI: detect Landolt-C markers in a list of images.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use log::{info, warn, LevelFilter};
use serde::Serialize;

use landoltc::detect::frame_from_image;
use landoltc::{Detection, LandoltCDetector, LandoltCParams, RotationMethod, VisionProcessor};

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error("failed to read config {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    ParseConfig {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Reference(#[from] landoltc::ReferenceError),

    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write report {path}: {source}")]
    WriteReport {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(not(feature = "tracing"))]
    #[error(transparent)]
    Logger(#[from] log::SetLoggerError),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum MethodArg {
    Moments,
    Skeleton,
    Auto,
}

impl From<MethodArg> for RotationMethod {
    fn from(m: MethodArg) -> Self {
        match m {
            MethodArg::Moments => RotationMethod::Moments,
            MethodArg::Skeleton => RotationMethod::Skeleton,
            MethodArg::Auto => RotationMethod::Auto,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "landoltc")]
#[command(about = "Detect Landolt-C markers and their gap orientation in images")]
#[command(version)]
struct Cli {
    /// Detector configuration (JSON). Defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Reference template image; overrides `reference_image_path`.
    #[arg(long)]
    reference: Option<PathBuf>,

    /// Rotation estimator; overrides `rotation.method`.
    #[arg(long, value_enum)]
    method: Option<MethodArg>,

    /// Report path (JSON). Printed to stdout when omitted.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace, off).
    #[arg(long, default_value = "warn")]
    log_level: LevelFilter,

    /// Emit JSON logs (only with the `tracing` feature).
    #[arg(long)]
    json_logs: bool,

    /// Input images, processed in order as frames 0, 1, 2, ...
    #[arg(required = true)]
    images: Vec<PathBuf>,
}

#[derive(Debug, Serialize)]
struct ImageReport {
    path: PathBuf,
    timestamp_ms: u64,
    error: Option<String>,
    num_candidates: usize,
    num_raw: usize,
    detections: Vec<Detection>,
}

#[derive(Debug, Serialize)]
struct Report {
    params: LandoltCParams,
    images: Vec<ImageReport>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) -> Result<(), CliError> {
    #[cfg(feature = "tracing")]
    landoltc::core::init_tracing(cli.json_logs);
    #[cfg(not(feature = "tracing"))]
    {
        if cli.json_logs {
            eprintln!("--json-logs requires the `tracing` feature; using plain logs");
        }
        let level = landoltc::core::level_from_env(cli.log_level);
        landoltc::core::init_with_level(level)?;
    }
    Ok(())
}

fn load_params(cli: &Cli) -> Result<LandoltCParams, CliError> {
    let mut params = match &cli.config {
        Some(path) => {
            let raw = fs::read_to_string(path).map_err(|source| CliError::ReadConfig {
                path: path.clone(),
                source,
            })?;
            serde_json::from_str(&raw).map_err(|source| CliError::ParseConfig {
                path: path.clone(),
                source,
            })?
        }
        None => LandoltCParams::default(),
    };
    if let Some(reference) = &cli.reference {
        params.reference_image_path = Some(reference.clone());
    }
    if let Some(method) = cli.method {
        params.rotation.method = method.into();
    }
    Ok(params)
}

fn run(cli: Cli) -> Result<(), CliError> {
    init_logging(&cli)?;
    let params = load_params(&cli)?;
    let mut detector = LandoltCDetector::initialize(params.clone())?;

    let mut images = Vec::with_capacity(cli.images.len());
    for (idx, path) in cli.images.iter().enumerate() {
        let timestamp = Duration::from_millis(idx as u64);
        images.push(process_image(&mut detector, path, timestamp));
    }

    let found: usize = images.iter().map(|r| r.detections.len()).sum();
    info!("{} image(s), {} detection(s)", images.len(), found);

    let json = serde_json::to_string_pretty(&Report { params, images })?;
    match &cli.output {
        Some(path) => write_report(path, &json),
        None => {
            println!("{json}");
            Ok(())
        }
    }
}

fn process_image(detector: &mut LandoltCDetector, path: &Path, timestamp: Duration) -> ImageReport {
    let mut report = ImageReport {
        path: path.to_path_buf(),
        timestamp_ms: timestamp.as_millis() as u64,
        error: None,
        num_candidates: 0,
        num_raw: 0,
        detections: Vec::new(),
    };
    let img = match image::open(path) {
        Ok(img) => img.to_luma8(),
        Err(err) => {
            warn!("skipping {}: {}", path.display(), err);
            report.error = Some(err.to_string());
            return report;
        }
    };
    let result = detector.detect(&frame_from_image(&img, timestamp));
    report.num_candidates = result.candidates.len();
    report.num_raw = result.raw.len();
    report.detections = result.detections;
    report
}

fn write_report(path: &Path, json: &str) -> Result<(), CliError> {
    let write = || -> std::io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, json)
    };
    write().map_err(|source| CliError::WriteReport {
        path: path.to_path_buf(),
        source,
    })?;
    info!("wrote report to {}", path.display());
    Ok(())
}
