//! Tripsync CLI
//!
//! Command-line tools for inspecting and exercising tripsync.
//!
//! # Commands
//!
//! - `merge` - Merge two JSON envelope batches with LWW resolution
//! - `cursor` - Show or reset a sync cursor file
//! - `simulate` - Run an in-process multi-device sync simulation

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Tripsync command-line tools.
#[derive(Parser)]
#[command(name = "tripsync")]
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
    /// Merge two JSON envelope batches
    Merge {
        /// Local batch (JSON array of envelopes)
        local: PathBuf,

        /// Remote batch (JSON array of envelopes)
        remote: PathBuf,

        /// Write the merged batch here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format (json, text)
        #[arg(short, long, default_value = "json")]
        format: String,
    },

    /// Inspect or reset a sync cursor file
    Cursor {
        #[command(subcommand)]
        action: CursorAction,
    },

    /// Simulate several devices syncing through one server
    Simulate {
        /// Number of devices
        #[arg(short, long, default_value = "3")]
        devices: usize,

        /// Records written per device
        #[arg(short, long, default_value = "10")]
        records: usize,

        /// Write every device's records before the first sync
        #[arg(long)]
        seed_offline: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum CursorAction {
    /// Print the saved cursor
    Show {
        /// Path to the cursor file
        #[arg(short, long)]
        path: PathBuf,
    },

    /// Clear the cursor so the next pull fetches everything
    Reset {
        /// Path to the cursor file
        #[arg(short, long)]
        path: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG overrides the default level.
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Merge {
            local,
            remote,
            output,
            format,
        } => {
            commands::merge::run(&local, &remote, output.as_deref(), &format)?;
        }
        Commands::Cursor { action } => match action {
            CursorAction::Show { path } => commands::cursor::show(&path)?,
            CursorAction::Reset { path } => commands::cursor::reset(&path)?,
        },
        Commands::Simulate {
            devices,
            records,
            seed_offline,
            format,
        } => {
            commands::simulate::run(devices, records, seed_offline, &format)?;
        }
        Commands::Version => {
            println!("tripsync CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
