//! Opening range breakout backtester - main entry point
//!
//! This binary provides three subcommands:
//! - backtest: Run the breakout backtest and compare strike policies
//! - expiry: Show the expiry selected for a trade date
//! - validate: Load and validate a bar file

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "orb-backtest")]
#[command(about = "Bank Nifty opening-bar breakout backtester with simulated option premiums", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run breakout backtest
    Backtest {
        /// Path to configuration file
        #[arg(short, long, default_value = "configs/banknifty_weekly.json")]
        config: String,

        /// CSV of 5-minute spot bars (overrides config file)
        #[arg(short, long)]
        data: Option<String>,

        /// Contract lot size (overrides config file)
        #[arg(long)]
        lot_size: Option<u32>,

        /// Expiry policy: weekly or monthly (overrides config file)
        #[arg(short, long)]
        expiry: Option<String>,

        /// Strike policies to compare (comma-separated). E.g., "ATM,OTM_100"
        #[arg(short, long)]
        strikes: Option<String>,

        /// Directory to export CSV/JSON results into
        #[arg(long)]
        export: Option<String>,

        /// Number of recent trades of the best policy to show
        #[arg(long, default_value = "10")]
        last: usize,

        /// Run sequentially instead of parallel
        #[arg(long)]
        sequential: bool,
    },

    /// Show the option expiry selected for a trade date
    Expiry {
        /// Trade date (YYYY-MM-DD)
        #[arg(short, long)]
        date: String,

        /// Expiry policy: weekly or monthly
        #[arg(short, long, default_value = "weekly")]
        policy: String,
    },

    /// Load and validate a bar file
    Validate {
        /// CSV of spot bars
        #[arg(short, long, default_value = "data/BANKNIFTY_5m.csv")]
        data: String,
    },
}

fn setup_logging(verbose: bool, command_name: &str, file_only: bool) -> Result<()> {
    // Create logs directory
    std::fs::create_dir_all("logs")?;

    // Log file naming pattern: {command}_{date}.log
    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    let level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    // Each branch builds its own file layer; the layer type depends on the subscriber stack
    if file_only {
        // Keep the console clean for the progress bar
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_appender)
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .init();
    } else {
        let console_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(true);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_appender)
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .init();
    }

    info!("Logging initialized");
    info!("Log file: {}", log_path.display());

    Ok(())
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let (command_name, file_only) = match &cli.command {
        Commands::Backtest { .. } => ("backtest", true),
        Commands::Expiry { .. } => ("expiry", false),
        Commands::Validate { .. } => ("validate", false),
    };

    setup_logging(cli.verbose, command_name, file_only)?;

    match cli.command {
        Commands::Backtest {
            config,
            data,
            lot_size,
            expiry,
            strikes,
            export,
            last,
            sequential,
        } => commands::backtest::run(commands::backtest::BacktestArgs {
            config_path: config,
            data_override: data,
            lot_size_override: lot_size,
            expiry_override: expiry,
            strikes_override: strikes,
            export_dir: export,
            last_trades: last,
            sequential,
        }),

        Commands::Expiry { date, policy } => commands::expiry::run(date, policy),

        Commands::Validate { data } => commands::validate::run(data),
    }
}
