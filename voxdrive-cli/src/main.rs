//! `voxdrive` — command-line host for the voice command recognizer.
//!
//! Subcommands:
//!
//! | command    | purpose                                              |
//! |------------|------------------------------------------------------|
//! | `listen`   | interactive loop: record a clip, recognize, dispatch |
//! | `record`   | capture labelled training takes as WAV files         |
//! | `features` | featurize a dataset and fit the scaler artifact      |
//! | `devices`  | list input devices and serial ports                  |

mod commands;

use clap::{Parser, Subcommand};

use commands::{devices, features, listen, record};

/// Voice command recognizer for a serial-attached vehicle.
#[derive(Parser)]
#[command(name = "voxdrive", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Listen for spoken commands and drive the serial link
    Listen(listen::ListenArgs),
    /// Record labelled training clips into a dataset directory
    Record(record::RecordArgs),
    /// Extract features from a dataset and fit the scaler
    Features(features::FeaturesArgs),
    /// List audio input devices and serial ports
    Devices,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voxdrive=info,voxdrive_core=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Listen(args) => listen::run(args),
        Command::Record(args) => record::run(args),
        Command::Features(args) => features::run(args),
        Command::Devices => devices::run(),
    };

    if let Err(e) = result {
        tracing::error!("fatal: {e:#}");
        std::process::exit(1);
    }
}
