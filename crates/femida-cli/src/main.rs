// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Femida — command-line front end.
//
// Entry point. Initialises logging, parses the command line and runs one
// pipeline stage over a sheet image.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;

use femida_core::human_errors::humanize_error;
use femida_core::{DetectConfig, FemidaError, Result};
use femida_detect::{AnswerSheet, IdentityPayload, SheetOptions, SheetSource};

#[derive(Parser)]
#[command(name = "femida")]
#[command(about = "Rectify photographed answer sheets and extract their bubble regions")]
#[command(version)]
struct Cli {
    /// Detection settings (JSON). Defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rectify a raw photograph onto the canonical sheet.
    Rectify {
        /// Path to the raw photograph.
        #[arg(long)]
        image: PathBuf,

        /// Path to write the rectified image.
        #[arg(long)]
        out: PathBuf,
    },

    /// Extract all bubble regions and report their mean intensity.
    Regions {
        /// Path to the sheet image.
        #[arg(long)]
        image: PathBuf,

        /// The image is a raw photograph and must be rectified first.
        #[arg(long)]
        raw: bool,

        /// Resample every patch to an N x N square.
        #[arg(long)]
        resize: Option<u32>,

        /// Path to write the region report (JSON).
        #[arg(long)]
        out: PathBuf,
    },

    /// Decode the sheet's QR identity code and print its payload.
    Identity {
        /// Path to the sheet image.
        #[arg(long)]
        image: PathBuf,
    },

    /// Draw every calibration box onto the sheet.
    Overlay {
        /// Path to the sheet image.
        #[arg(long)]
        image: PathBuf,

        /// The image is a raw photograph and must be rectified first.
        #[arg(long)]
        raw: bool,

        /// Path to write the overlay image.
        #[arg(long)]
        out: PathBuf,
    },

    /// Write the default detection settings.
    Config {
        /// Path to write the config (JSON).
        #[arg(long)]
        out: PathBuf,
    },
}

/// Per-bubble summary written by `femida regions`.
#[derive(Debug, Serialize)]
struct RegionReport {
    /// `(batch, channel, height, width)` of the extracted tensor.
    shape: [usize; 4],
    regions: Vec<RegionEntry>,
}

#[derive(Debug, Serialize)]
struct RegionEntry {
    key: String,
    mean_intensity: f32,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "femida failed");
            let human = humanize_error(&err);
            eprintln!("{}", human.message);
            eprintln!("  {}", human.suggestion);
            if human.retake_photo {
                eprintln!("  (a new photograph of the sheet is likely to help)");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => DetectConfig::load(path)?,
        None => DetectConfig::default(),
    };

    match cli.command {
        Commands::Rectify { image, out } => {
            let sheet = open_sheet(&image, true, config)?;
            sheet.save(&out)?;
            tracing::info!("Rectified sheet written to {}", out.display());
        }
        Commands::Regions {
            image,
            raw,
            resize,
            out,
        } => {
            let sheet = open_sheet(&image, raw, config)?;
            let report = region_report(&sheet, resize)?;
            std::fs::write(&out, serde_json::to_string_pretty(&report)?)?;
            tracing::info!(
                regions = report.regions.len(),
                "Region report written to {}",
                out.display()
            );
        }
        Commands::Identity { image } => {
            let identity = read_identity(&image)?;
            println!("{}", serde_json::to_string_pretty(identity.as_map())?);
        }
        Commands::Overlay { image, raw, out } => {
            let sheet = open_sheet(&image, raw, config)?;
            sheet.calibration_overlay().save(&out).map_err(|err| {
                FemidaError::ImageError(format!(
                    "failed to save overlay {}: {}",
                    out.display(),
                    err
                ))
            })?;
            tracing::info!("Overlay written to {}", out.display());
        }
        Commands::Config { out } => {
            config.save(&out)?;
            tracing::info!("Config written to {}", out.display());
        }
    }

    Ok(())
}

fn open_sheet(path: &Path, raw: bool, config: DetectConfig) -> Result<AnswerSheet> {
    tracing::info!("Loading image: {}", path.display());
    let source = if raw {
        SheetSource::Raw
    } else {
        SheetSource::Rectified
    };
    let options = SheetOptions {
        validate_identity: false,
        config,
    };
    AnswerSheet::open(path, source, options)
}

/// Decode the identity code of a sheet image as captured; the code is read
/// from raw photographs and rectified sheets alike.
fn read_identity(path: &Path) -> Result<IdentityPayload> {
    tracing::info!("Loading image: {}", path.display());
    let image = femida_detect::load_image(path)?;
    femida_detect::validate(&image)
}

fn region_report(sheet: &AnswerSheet, resize: Option<u32>) -> Result<RegionReport> {
    let batch = sheet.regions(resize)?;
    let (n, c, h, w) = batch.tensor().dim();
    let regions = batch
        .keys()
        .iter()
        .enumerate()
        .map(|(index, key)| RegionEntry {
            key: key.to_string(),
            mean_intensity: batch.mean_intensity(index).unwrap_or(0.0),
        })
        .collect();
    Ok(RegionReport {
        shape: [n, c, h, w],
        regions,
    })
}
