//! Mantle CLI
//!
//! Command-line tools for Mantle chunk files.
//!
//! # Commands
//!
//! - `inspect` - Display the frame layout of every chunk in a file
//! - `verify` - Check that a file is a clean sequence of chunks

mod commands;

use clap::{Parser, Subcommand};
use mantle_core::CURRENT_FORMAT_VERSION;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Mantle command-line chunk tools.
#[derive(Parser)]
#[command(name = "mantle")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display the frame layout of every chunk in a file
    Inspect {
        /// Chunk file to read
        file: PathBuf,

        /// Format version the file was written with
        #[arg(long, default_value_t = CURRENT_FORMAT_VERSION)]
        format_version: u8,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Check that a file is a clean sequence of chunks
    Verify {
        /// Chunk file to read
        file: PathBuf,

        /// Format version the file was written with
        #[arg(long, default_value_t = CURRENT_FORMAT_VERSION)]
        format_version: u8,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Inspect {
            file,
            format_version,
            format,
        } => {
            commands::inspect::run(&file, format_version, &format)?;
        }
        Commands::Verify {
            file,
            format_version,
        } => {
            commands::verify::run(&file, format_version)?;
        }
        Commands::Version => {
            println!("Mantle CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Mantle Core v{}", mantle_core::VERSION);
            println!("Chunk format v{}", CURRENT_FORMAT_VERSION);
        }
    }

    Ok(())
}
