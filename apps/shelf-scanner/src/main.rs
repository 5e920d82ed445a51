//! # shelf-scan
//!
//! Command-line front end for the ISBN acquisition engine.
//!
//! ## Output Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  stdout  one JSON document per command                                  │
//! │          scan / recognize → {"code": "9780134685991", "source": "camera"}│
//! │          normalize        → {"raw": ..., "normalized": ..., "valid": ..} │
//! │                                                                         │
//! │  stderr  notices, decoder warnings, tracing output                      │
//! │                                                                         │
//! │  exit    0 success / cancelled, 1 on any error                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod cli;
mod sink;
mod wedge;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use shelf_acquire::{AcquireConfig, AcquireError, CameraPlatform, IsbnAcquirer, ScanResult};
use shelf_core::CandidateCode;

use crate::cli::{Cli, Commands, ConfigArgs, NormalizeArgs, RecognizeArgs, ScanArgs};
use crate::sink::ConsoleSink;
use crate::wedge::WedgePlatform;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    debug!(?cli, "Parsed command line");

    match cli.command {
        Commands::Normalize(args) => normalize(args),
        Commands::Config(args) => config(cli.config.as_deref(), args),
        Commands::Scan(args) => {
            let config = load_config(cli.config.as_deref())?;
            scan(config, args).await
        }
        Commands::Recognize(args) => {
            let config = load_config(cli.config.as_deref())?;
            recognize(config, args).await
        }
    }
}

/// Initializes the tracing subscriber on stderr.
///
/// ## Log Levels
/// - `RUST_LOG` wins when set
/// - `-v` debug, `-vv` trace for the shelf crates
/// - Default: warn, so stdout stays clean for JSON
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "warn,shelf_acquire=debug,shelf_scan=debug",
        _ => "info,shelf_acquire=trace,shelf_core=trace,shelf_scan=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<AcquireConfig> {
    AcquireConfig::load(path.map(Path::to_path_buf)).context("failed to load scanner configuration")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to encode output")?;
    println!("{}", json);
    Ok(())
}

// =============================================================================
// Commands
// =============================================================================

async fn scan(mut config: AcquireConfig, args: ScanArgs) -> Result<()> {
    if let Some(device) = args.device {
        config.camera.device_id = Some(device);
    }

    let fallback_image = match &args.image {
        Some(path) => Some(read_image(path)?),
        None => None,
    };

    let platform: Arc<dyn CameraPlatform> = Arc::new(WedgePlatform::stdin());
    let mut acquirer =
        IsbnAcquirer::from_config(&config, Some(platform)).with_sink(Arc::new(ConsoleSink));

    let session = acquirer.begin_session()?;
    let (handle, task) = session.spawn();
    eprintln!("Scanning… type or scan a barcode, Ctrl+C to cancel");

    let ctrl_c = tokio::spawn({
        let handle = handle.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl+C received, cancelling scan");
                handle.cancel();
            }
        }
    });

    let outcome = task.await.context("scan session task panicked")?;
    ctrl_c.abort();

    match outcome {
        Ok(result) => print_json(&result),
        Err(AcquireError::Cancelled) => {
            eprintln!("Scan cancelled");
            Ok(())
        }
        Err(e) if e.suggests_still_image() => match fallback_image {
            Some(image) if acquirer.has_vision() => {
                warn!(error = %e, "Camera unusable, recognizing fallback image");
                let result = acquirer.recognize_image(&image).await?;
                print_json(&result)
            }
            _ => Err(anyhow::Error::new(e).context("no usable camera; try `shelf-scan recognize <image>`")),
        },
        Err(e) => Err(e.into()),
    }
}

async fn recognize(config: AcquireConfig, args: RecognizeArgs) -> Result<()> {
    let image = read_image(&args.image)?;
    let acquirer = IsbnAcquirer::from_config(&config, None);

    let result: ScanResult = acquirer
        .recognize_image(&image)
        .await
        .with_context(|| format!("could not recognize an ISBN in {}", args.image.display()))?;

    print_json(&result)
}

#[derive(Debug, Serialize)]
struct NormalizeReport {
    raw: String,
    normalized: String,
    valid: bool,
    kind: Option<String>,
    checksum_ok: bool,
}

fn normalize(args: NormalizeArgs) -> Result<()> {
    let candidate = CandidateCode::from_raw(&args.text);
    let kind = candidate.validate().ok().map(|k| k.to_string());

    print_json(&NormalizeReport {
        checksum_ok: candidate.checksum_matches(),
        valid: candidate.valid,
        kind,
        normalized: candidate.normalized,
        raw: candidate.raw,
    })
}

fn config(path: Option<&Path>, args: ConfigArgs) -> Result<()> {
    if args.init {
        let target = path
            .map(Path::to_path_buf)
            .or_else(AcquireConfig::default_config_path)
            .context("no config directory available on this platform")?;

        if target.exists() {
            eprintln!("Config already exists at {}", target.display());
        } else {
            let written = AcquireConfig::default().save(Some(target))?;
            eprintln!("Wrote default config to {}", written.display());
        }
        return Ok(());
    }

    let config = load_config(path)?;
    let rendered = toml::to_string_pretty(&config.redacted()).context("failed to render config")?;
    print!("{}", rendered);
    Ok(())
}

fn read_image(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read image {}", path.display()))
}
