// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};

mod cli;

#[derive(Parser)]
#[command(name = "shutter")]
#[command(about = "Camera capture session controller")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available capture devices
    List,

    /// Take a photo
    Photo {
        /// Device id to use (from 'shutter list')
        #[arg(long)]
        device: Option<String>,

        /// Flash mode: on, off or auto
        #[arg(long)]
        flash: Option<String>,

        /// Produce a half-size image
        #[arg(long)]
        small: bool,

        /// Apply the mono color effect
        #[arg(long)]
        black_and_white: bool,
    },

    /// Record a video
    Video {
        /// Device id to use (from 'shutter list')
        #[arg(long)]
        device: Option<String>,

        /// Recording duration in seconds
        #[arg(short, long, default_value = "10")]
        duration: u64,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=shutter=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::List => cli::list_devices(),
        Commands::Photo {
            device,
            flash,
            small,
            black_and_white,
        } => cli::take_photo(device, flash, small, black_and_white),
        Commands::Video { device, duration } => cli::record_video(device, duration),
    }
}
