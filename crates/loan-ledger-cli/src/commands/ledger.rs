use chrono::NaiveDateTime;
use clap::Args;
use serde_json::{json, Value};

use loan_ledger_core::{
    expected_weekly_payment, LedgerConfig, Loan, Timestamp, WeekMode, WeeklyPaymentLedger,
};

use crate::input;

/// Arguments shared by every single-loan command
#[derive(Args)]
pub struct LoanArgs {
    /// Path to a JSON loan record (otherwise read from stdin)
    #[arg(long)]
    pub input: Option<String>,

    /// Reference date, e.g. 2025-10-15 or 2025-10-15T09:00:00-06:00 (defaults to now)
    #[arg(long)]
    pub now: Option<String>,
}

/// Arguments for the expected weekly payment
#[derive(Args)]
pub struct ExpectedPaymentArgs {
    /// Path to a JSON loan record (otherwise read from stdin)
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for arrears evaluation and the week-by-week replay
#[derive(Args)]
pub struct VdoArgs {
    #[command(flatten)]
    pub loan: LoanArgs,

    /// Which weeks count as elapsed: current or next
    #[arg(long, env = "LEDGER_WEEK_MODE")]
    pub week_mode: Option<WeekMode>,
}

pub fn run_expected_payment(args: ExpectedPaymentArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let loan = read_loan(args.input.as_deref())?;
    Ok(json!({
        "loan_id": loan.id,
        "expected_weekly_payment": expected_weekly_payment(&loan),
    }))
}

pub fn run_vdo(args: VdoArgs, config: &LedgerConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let loan = read_loan(args.loan.input.as_deref())?;
    let now = reference_date(args.loan.now.as_deref(), config)?;
    let mode = args.week_mode.unwrap_or(config.week_mode);

    let ledger = WeeklyPaymentLedger::new(config.clone());
    let result = ledger.calculate_vdo(&loan, now, mode);
    Ok(serde_json::to_value(result)?)
}

pub fn run_abono(args: LoanArgs, config: &LedgerConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let loan = read_loan(args.input.as_deref())?;
    let now = reference_date(args.now.as_deref(), config)?;

    let ledger = WeeklyPaymentLedger::new(config.clone());
    let result = ledger.calculate_abono_parcial(&loan, now);
    Ok(serde_json::to_value(result)?)
}

pub fn run_replay(args: VdoArgs, config: &LedgerConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let loan = read_loan(args.loan.input.as_deref())?;
    let now = reference_date(args.loan.now.as_deref(), config)?;
    let mode = args.week_mode.unwrap_or(config.week_mode);

    let ledger = WeeklyPaymentLedger::new(config.clone());
    let weeks = ledger.replay_weeks(&loan, now, mode);
    Ok(serde_json::to_value(weeks)?)
}

fn read_loan(path: Option<&str>) -> Result<Loan, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        input::file::read_json(path)
    } else if let Some(data) = input::stdin::read_stdin()? {
        Ok(serde_json::from_value(data)?)
    } else {
        Err("--input file is required (or pipe a loan record on stdin)".into())
    }
}

/// Parse `--now` into ledger wall-clock time, defaulting to the current time.
pub fn reference_date(
    raw: Option<&str>,
    config: &LedgerConfig,
) -> Result<NaiveDateTime, Box<dyn std::error::Error>> {
    match raw {
        Some(raw) => {
            let ts: Timestamp = raw.parse()?;
            Ok(config.localize(&ts))
        }
        None => Ok(config.now_local()),
    }
}
