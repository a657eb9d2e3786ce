use clap::Args;
use serde_json::Value;

use loan_ledger_core::listing::{self, CollectionListingInput};
use loan_ledger_core::{LedgerConfig, WeekMode, WeeklyPaymentLedger};

use crate::input;

/// Arguments for the collection listing
#[derive(Args)]
pub struct ListingArgs {
    /// Path to a JSON file holding `{"loans": [...]}` or a bare array of loans
    #[arg(long)]
    pub input: Option<String>,

    /// Reference date (overrides the one in the input file)
    #[arg(long, alias = "reference-date")]
    pub now: Option<String>,

    /// Which weeks count as elapsed: current or next
    #[arg(long, env = "LEDGER_WEEK_MODE")]
    pub week_mode: Option<WeekMode>,
}

pub fn run_listing(args: ListingArgs, config: &LedgerConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let data: Value = if let Some(ref path) = args.input {
        input::file::read_json_value(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        return Err("--input file is required for a collection listing".into());
    };

    let mut listing_input: CollectionListingInput = match data {
        Value::Array(loans) => CollectionListingInput {
            loans: serde_json::from_value(Value::Array(loans))?,
            reference_date: None,
            week_mode: None,
        },
        other => serde_json::from_value(other)?,
    };

    if args.now.is_some() {
        listing_input.reference_date = args.now;
    }
    if args.week_mode.is_some() {
        listing_input.week_mode = args.week_mode;
    }

    let ledger = WeeklyPaymentLedger::new(config.clone());
    let result = listing::collection_listing(&listing_input, &ledger)?;
    Ok(serde_json::to_value(result)?)
}
