use loan_ledger_core::listing::{self, CollectionListingInput};
use loan_ledger_core::{
    expected_weekly_payment as expected_payment, LedgerConfig, Loan, Timestamp, WeekMode,
    WeeklyPaymentLedger,
};
use napi::Result as NapiResult;
use napi_derive::napi;
use serde::Deserialize;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Request shape shared by the per-loan calculations.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoanRequest {
    loan: Loan,
    /// Reference date; defaults to now.
    #[serde(default)]
    now: Option<String>,
    #[serde(default)]
    week_mode: Option<WeekMode>,
    #[serde(default)]
    config: Option<LedgerConfig>,
}

impl LoanRequest {
    fn parse(input_json: &str) -> NapiResult<Self> {
        let request: LoanRequest = serde_json::from_str(input_json).map_err(to_napi_error)?;
        if let Some(config) = &request.config {
            config.validate().map_err(to_napi_error)?;
        }
        Ok(request)
    }

    fn ledger(&self) -> WeeklyPaymentLedger {
        WeeklyPaymentLedger::new(self.config.clone().unwrap_or_default())
    }

    fn reference_date(&self, ledger: &WeeklyPaymentLedger) -> NapiResult<chrono::NaiveDateTime> {
        match &self.now {
            Some(raw) => {
                let ts: Timestamp = raw.parse().map_err(to_napi_error)?;
                Ok(ledger.config().localize(&ts))
            }
            None => Ok(ledger.config().now_local()),
        }
    }

    fn week_mode(&self, ledger: &WeeklyPaymentLedger) -> WeekMode {
        self.week_mode.unwrap_or(ledger.config().week_mode)
    }
}

// ---------------------------------------------------------------------------
// Per-loan calculations
// ---------------------------------------------------------------------------

#[napi]
pub fn expected_weekly_payment(loan_json: String) -> NapiResult<String> {
    let loan: Loan = serde_json::from_str(&loan_json).map_err(to_napi_error)?;
    serde_json::to_string(&expected_payment(&loan)).map_err(to_napi_error)
}

#[napi]
pub fn calculate_vdo(input_json: String) -> NapiResult<String> {
    let request = LoanRequest::parse(&input_json)?;
    let ledger = request.ledger();
    let now = request.reference_date(&ledger)?;
    let output = ledger.calculate_vdo(&request.loan, now, request.week_mode(&ledger));
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn calculate_abono_parcial(input_json: String) -> NapiResult<String> {
    let request = LoanRequest::parse(&input_json)?;
    let ledger = request.ledger();
    let now = request.reference_date(&ledger)?;
    let output = ledger.calculate_abono_parcial(&request.loan, now);
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn replay_weeks(input_json: String) -> NapiResult<String> {
    let request = LoanRequest::parse(&input_json)?;
    let ledger = request.ledger();
    let now = request.reference_date(&ledger)?;
    let output = ledger.replay_weeks(&request.loan, now, request.week_mode(&ledger));
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

#[napi]
pub fn collection_listing(input_json: String, config_json: Option<String>) -> NapiResult<String> {
    let input: CollectionListingInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let config: LedgerConfig = match config_json {
        Some(raw) => serde_json::from_str(&raw).map_err(to_napi_error)?,
        None => LedgerConfig::default(),
    };
    config.validate().map_err(to_napi_error)?;

    let ledger = WeeklyPaymentLedger::new(config);
    let output = listing::collection_listing(&input, &ledger).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
