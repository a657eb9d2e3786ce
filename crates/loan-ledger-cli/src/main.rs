mod commands;
mod input;
mod output;
mod settings;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use loan_ledger_core::LedgerConfig;
use serde_json::Value;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::ledger::{ExpectedPaymentArgs, LoanArgs, VdoArgs};
use commands::listing::ListingArgs;

/// Weekly-payment arrears and advance-credit calculations
#[derive(Parser)]
#[command(
    name = "ledger",
    version,
    about = "Weekly-payment arrears and advance-credit calculations",
    long_about = "Replays a loan's payment history week by week to report overdue \
                  installments (VDO) and advance credit (abono parcial), singly or as \
                  a collection listing for a batch of loans."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Ledger configuration file (YAML or JSON)
    #[arg(long, global = true, env = "LEDGER_CONFIG")]
    config: Option<String>,

    /// Offset of the ledger's wall clock from UTC, in minutes (e.g. -360)
    #[arg(long, global = true, env = "LEDGER_UTC_OFFSET_MINUTES", allow_negative_numbers = true)]
    utc_offset_minutes: Option<i32>,

    /// Log calculation details to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Expected weekly installment for a loan
    ExpectedPayment(ExpectedPaymentArgs),
    /// Overdue weeks and arrears amount (VDO)
    Vdo(VdoArgs),
    /// Advance credit paid in the current week (abono parcial)
    Abono(LoanArgs),
    /// Week-by-week replay behind the arrears figure
    Replay(VdoArgs),
    /// Arrears and advance credit for a batch of loans
    Listing(ListingArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("loan_ledger_core=debug,loan_ledger_cli=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(command: Commands, config: &LedgerConfig) -> Result<Value, Box<dyn std::error::Error>> {
    match command {
        Commands::ExpectedPayment(args) => commands::ledger::run_expected_payment(args),
        Commands::Vdo(args) => commands::ledger::run_vdo(args, config),
        Commands::Abono(args) => commands::ledger::run_abono(args, config),
        Commands::Replay(args) => commands::ledger::run_replay(args, config),
        Commands::Listing(args) => commands::listing::run_listing(args, config),
        Commands::Version => Ok(Value::String(format!("ledger {}", env!("CARGO_PKG_VERSION")))),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Version => {
            println!("ledger {}", env!("CARGO_PKG_VERSION"));
            return;
        }
        command => settings::load(cli.config.as_deref(), cli.utc_offset_minutes)
            .and_then(|config| run(command, &config)),
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
