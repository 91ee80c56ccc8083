// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! LCDI CLI - supply-chain paths and remaining delivery time

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::estimate::EstimateArgs;
use commands::GlobalOpts;

#[derive(Parser)]
#[command(name = "lcdi")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Supply-chain graph file (JSON)
    #[arg(short, long, env = "LCDI_GRAPH", global = true)]
    graph: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, env = "LCDI_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Cache directory override
    #[arg(long, env = "LCDI_CACHE_DIR", global = true)]
    cache_dir: Option<PathBuf>,

    /// Neither read nor write persisted caches
    #[arg(long, global = true)]
    no_cache: bool,

    /// Disable colored output (any non-empty NO_COLOR except false/0/no/off)
    #[arg(
        long,
        env = "NO_COLOR",
        global = true,
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    no_color: bool,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List probability-weighted paths from a vertex to the manufacturer
    Paths {
        /// Vertex id or name
        vertex: String,

        /// Carriers to weight paths for
        #[arg(short = 'C', long = "carrier", required = true, num_args = 1..)]
        carriers: Vec<String>,

        /// Keep paths with zero probability
        #[arg(long)]
        include_zero: bool,
    },

    /// Estimate remaining delivery time for a shipment
    Estimate {
        /// Current vertex id or name
        vertex: String,

        /// Carriers that may handle the shipment
        #[arg(short = 'C', long = "carrier", required = true, num_args = 1..)]
        carriers: Vec<String>,

        /// Order time (RFC 3339)
        #[arg(long = "order")]
        order_time: DateTime<Utc>,

        /// Shipment time (RFC 3339)
        #[arg(long = "shipment")]
        shipment_time: DateTime<Utc>,

        /// Time the shipment reached the vertex (RFC 3339)
        #[arg(long = "event")]
        event_time: DateTime<Utc>,

        /// Estimation time (RFC 3339, default now)
        #[arg(long = "at")]
        estimation_time: Option<DateTime<Utc>>,

        /// JSON file with the lane's shipment-time distribution
        #[arg(short, long)]
        distribution: PathBuf,

        /// Fixed blend weight of the transit-time estimate
        #[arg(long)]
        alpha: Option<f64>,

        /// Weight below which a branch is skipped
        #[arg(long)]
        tolerance: Option<f64>,

        /// Compute path and transit time one after the other
        #[arg(long)]
        sequential: bool,
    },

    /// Check graph integrity (cycles, flow conservation, dead ends)
    Check {
        /// Fail if anything is found
        #[arg(long)]
        strict: bool,
    },

    /// Export graph to various formats
    Export {
        /// Output format (dot, json)
        #[arg(short, long, default_value = "dot")]
        format: String,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the effective configuration
    Config {
        /// Dotted configuration key
        key: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: clap_complete::Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over -v/-q
    let log_level = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("lcdi={log_level},lcdi_engine={log_level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_ansi(!cli.no_color)
        .init();

    let opts = GlobalOpts {
        graph: cli.graph,
        config: cli.config,
        cache_dir: cli.cache_dir,
        no_cache: cli.no_cache,
        json: cli.json,
        no_color: cli.no_color,
    };

    // Execute command
    match cli.command {
        Commands::Paths {
            vertex,
            carriers,
            include_zero,
        } => commands::paths::run(&opts, &vertex, &carriers, include_zero),
        Commands::Estimate {
            vertex,
            carriers,
            order_time,
            shipment_time,
            event_time,
            estimation_time,
            distribution,
            alpha,
            tolerance,
            sequential,
        } => commands::estimate::run(
            &opts,
            EstimateArgs {
                vertex,
                carriers,
                order_time,
                shipment_time,
                event_time,
                estimation_time,
                distribution,
                alpha,
                tolerance,
                sequential,
            },
        ),
        Commands::Check { strict } => commands::check::run(&opts, strict),
        Commands::Export { format, output } => commands::export::run(&opts, &format, output),
        Commands::Config { key } => commands::config::run(&opts, key.as_deref()),
        Commands::Completions { shell } => commands::completions::run(shell, Cli::command()),
    }
}
