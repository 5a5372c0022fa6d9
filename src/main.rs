// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "live-effects")]
#[command(about = "Apply live image effects to PNG files")]
#[command(version = live_effects::constants::app_info::version())]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available effects
    List,

    /// Print an effect's schema, defaults and UI tree as JSON
    Describe {
        /// Effect id (from 'live-effects list')
        id: String,
    },

    /// Apply an effect to an image
    Apply {
        /// Effect id (from 'live-effects list')
        id: String,

        /// Input image
        input: PathBuf,

        /// Output file path (default: <input dir>/<stem>_<id>_TIMESTAMP.png)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Parameter override, repeatable (e.g. --param radius=12)
        #[arg(short, long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,

        /// JSON object of parameters, applied before --param overrides
        #[arg(long)]
        params_json: Option<PathBuf>,

        /// Resolution the input was rasterised at
        #[arg(long)]
        dpi: Option<f64>,

        /// Reference resolution (default: from config, usually 72)
        #[arg(long)]
        base_dpi: Option<f64>,

        /// Host clock in seconds for animated effects
        #[arg(long, default_value = "0")]
        time: f64,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=live_effects=debug, RUST_LOG=info
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
        Commands::List => cli::list_effects(),
        Commands::Describe { id } => cli::describe_effect(&id),
        Commands::Apply {
            id,
            input,
            output,
            params,
            params_json,
            dpi,
            base_dpi,
            time,
        } => cli::apply_effect(cli::ApplyArgs {
            id,
            input,
            output,
            params,
            params_json,
            dpi,
            base_dpi,
            time,
        }),
    }
}
