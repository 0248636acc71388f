// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Docscan: command-line document scanner.
//
// Entry point. Initialises logging, resolves the data directory and
// settings, and dispatches to a subcommand.

mod commands;
mod services;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use docscan_core::geometry::Size;
use docscan_core::human_errors::humanize_error;
use docscan_core::types::{DeviceOrientation, ExportFormat};

use commands::Context;

#[derive(Parser)]
#[command(name = "docscan")]
#[command(about = "Detect, straighten, enhance and export scanned documents")]
#[command(version)]
struct Cli {
    /// Settings file (defaults to <data dir>/config.json)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Data directory (defaults to $XDG_DATA_HOME/docscan)
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Find the document outline in an image and print it as JSON
    Detect {
        #[arg(value_name = "IMAGE")]
        image: PathBuf,
    },
    /// Detect, correct, enhance and save a document from an image
    Scan(ScanArgs),
    /// Drive a live session from a directory of frames
    Replay(ReplayArgs),
    /// List the enhancement profiles
    Profiles,
    /// Show capture tips
    Tips,
}

#[derive(clap::Args)]
struct ScanArgs {
    #[arg(value_name = "IMAGE")]
    image: PathBuf,

    /// Output format (defaults to the configured format)
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Enhancement profile name
    #[arg(long)]
    profile: Option<String>,

    /// Category folder: receipts, contact-cards, other, or any name
    #[arg(long)]
    category: Option<String>,

    /// File name without extension (defaults to the capture time)
    #[arg(long)]
    name: Option<String>,

    /// Store root (defaults to <data dir>/Documents)
    #[arg(long, value_name = "DIR")]
    out: Option<PathBuf>,

    /// Hand the document to the share outbox in DIR instead of the store
    #[arg(long, value_name = "DIR", conflicts_with = "out")]
    share: Option<PathBuf>,
}

#[derive(clap::Args)]
struct ReplayArgs {
    #[arg(value_name = "DIR")]
    dir: PathBuf,

    #[arg(long, value_enum, default_value_t = OrientationArg::LandscapeLeft)]
    orientation: OrientationArg,

    /// Preview surface as WIDTHxHEIGHT (defaults to the oriented frame size)
    #[arg(long, value_parser = parse_size)]
    preview: Option<Size>,

    /// Deliver frames at the camera frame rate
    #[arg(long)]
    pace: bool,

    /// Capture once the frames run out
    #[arg(long)]
    capture: bool,

    #[arg(long)]
    category: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Pdf,
    Png,
    Jpeg,
}

impl FormatArg {
    fn export_format(self, jpeg_quality: u8) -> ExportFormat {
        match self {
            Self::Pdf => ExportFormat::Pdf,
            Self::Png => ExportFormat::Png,
            Self::Jpeg => ExportFormat::Jpeg {
                quality: jpeg_quality,
            },
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OrientationArg {
    Portrait,
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
}

impl From<OrientationArg> for DeviceOrientation {
    fn from(arg: OrientationArg) -> Self {
        match arg {
            OrientationArg::Portrait => Self::Portrait,
            OrientationArg::PortraitUpsideDown => Self::PortraitUpsideDown,
            OrientationArg::LandscapeLeft => Self::LandscapeLeft,
            OrientationArg::LandscapeRight => Self::LandscapeRight,
        }
    }
}

fn parse_size(value: &str) -> Result<Size, String> {
    let (w, h) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {value:?}"))?;
    let w: f64 = w.trim().parse().map_err(|e| format!("bad width: {e}"))?;
    let h: f64 = h.trim().parse().map_err(|e| format!("bad height: {e}"))?;
    let size = Size::new(w, h);
    if size.is_empty() {
        return Err("preview size must be positive".into());
    }
    Ok(size)
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr; stdout carries results.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!("Docscan starting");

    let result = match Context::init(cli.data_dir.as_deref(), cli.config.as_deref()) {
        Ok(ctx) => match cli.command {
            Command::Detect { image } => commands::detect(&ctx, &image),
            Command::Scan(args) => commands::scan(&ctx, args),
            Command::Replay(args) => commands::replay(&ctx, args).await,
            Command::Profiles => commands::profiles(&ctx),
            Command::Tips => {
                commands::tips();
                Ok(())
            }
        },
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            let human = humanize_error(&e);
            eprintln!("{}: {}", human.title, human.message);
            eprintln!("{}", human.suggestion);
            ExitCode::FAILURE
        }
    }
}
