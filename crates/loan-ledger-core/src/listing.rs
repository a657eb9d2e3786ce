//! Collection listing: arrears and advance credit for a batch of loans, as
//! shown on a collector's route sheet.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::cache::{CalculationCache, Clock};
use crate::error::LedgerError;
use crate::ledger::{AbonoParcialOutput, VdoOutput, WeeklyPaymentLedger};
use crate::loan::Loan;
use crate::timestamp::Timestamp;
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::week::WeekMode;
use crate::LedgerResult;

// ---------------------------------------------------------------------------
// Input / Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionListingInput {
    pub loans: Vec<Loan>,
    /// Date the listing is generated for; defaults to now.
    #[serde(default, alias = "referenceDate")]
    pub reference_date: Option<String>,
    /// Falls back to the ledger's configured mode.
    #[serde(default, alias = "weekMode")]
    pub week_mode: Option<WeekMode>,
}

/// Both calculations for one loan at one reference date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanFigures {
    pub vdo: VdoOutput,
    pub abono: AbonoParcialOutput,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingRow {
    pub loan_id: Option<String>,
    pub borrower: Option<String>,
    pub expected_weekly_payment: Money,
    pub weeks_without_payment: u32,
    pub arrears_amount: Money,
    pub abono_parcial_amount: Money,
    pub arrears_display: String,
    pub abono_display: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingTotals {
    pub loan_count: usize,
    pub loans_in_arrears: usize,
    pub total_arrears: Money,
    pub total_abono: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionListingOutput {
    pub rows: Vec<ListingRow>,
    pub totals: ListingTotals,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Compute arrears and advance credit for every loan in the listing.
pub fn collection_listing(
    input: &CollectionListingInput,
    ledger: &WeeklyPaymentLedger,
) -> LedgerResult<ComputationOutput<CollectionListingOutput>> {
    build_listing(input, ledger, |loan, now, mode| {
        loan_figures(ledger, loan, now, mode)
    })
}

/// Same as [`collection_listing`], memoising per-loan figures in `cache`.
/// The cache must be dedicated to this reference date and week mode.
pub fn collection_listing_cached<C: Clock>(
    input: &CollectionListingInput,
    ledger: &WeeklyPaymentLedger,
    cache: &mut CalculationCache<LoanFigures, C>,
) -> LedgerResult<ComputationOutput<CollectionListingOutput>> {
    build_listing(input, ledger, |loan, now, mode| {
        cache.get_or_compute(loan, |l| loan_figures(ledger, l, now, mode))
    })
}

pub fn loan_figures(
    ledger: &WeeklyPaymentLedger,
    loan: &Loan,
    now: chrono::NaiveDateTime,
    mode: WeekMode,
) -> LoanFigures {
    LoanFigures {
        vdo: ledger.calculate_vdo(loan, now, mode),
        abono: ledger.calculate_abono_parcial(loan, now),
    }
}

/// Render an amount the way listings print it: `$900`, `$1,500`, `$12.50`.
pub fn format_currency(amount: Money) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let abs = rounded.abs();
    let whole = abs.trunc();
    let cents = ((abs - whole) * Decimal::ONE_HUNDRED)
        .trunc()
        .to_u32()
        .unwrap_or(0);

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if cents == 0 {
        format!("{sign}${grouped}")
    } else {
        format!("{sign}${grouped}.{cents:02}")
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn build_listing<F>(
    input: &CollectionListingInput,
    ledger: &WeeklyPaymentLedger,
    mut figures_for: F,
) -> LedgerResult<ComputationOutput<CollectionListingOutput>>
where
    F: FnMut(&Loan, chrono::NaiveDateTime, WeekMode) -> LoanFigures,
{
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let now = match &input.reference_date {
        Some(raw) => {
            let ts = Timestamp::parse(raw).ok_or_else(|| LedgerError::InvalidInput {
                field: "reference_date".into(),
                reason: format!("'{raw}' is not a recognised date"),
            })?;
            ledger.config().localize(&ts)
        }
        None => ledger.config().now_local(),
    };
    let mode = input.week_mode.unwrap_or(ledger.config().week_mode);

    let mut rows = Vec::with_capacity(input.loans.len());
    for (i, loan) in input.loans.iter().enumerate() {
        let label = loan.id.clone().unwrap_or_else(|| format!("#{i}"));
        if loan.sign_date.is_none() {
            warnings.push(format!(
                "Loan {label}: sign date missing or unparsable; arrears reported as zero."
            ));
        }

        let figures = figures_for(loan, now, mode);
        if figures.vdo.expected_weekly_payment.is_zero() {
            warnings.push(format!(
                "Loan {label}: expected weekly payment is zero; no week can be in arrears."
            ));
        }

        rows.push(ListingRow {
            loan_id: loan.id.clone(),
            borrower: loan.borrower.clone(),
            expected_weekly_payment: figures.vdo.expected_weekly_payment,
            weeks_without_payment: figures.vdo.weeks_without_payment,
            arrears_amount: figures.vdo.arrears_amount,
            abono_parcial_amount: figures.abono.abono_parcial_amount,
            arrears_display: format_currency(figures.vdo.arrears_amount),
            abono_display: format_currency(figures.abono.abono_parcial_amount),
        });
    }

    let totals = ListingTotals {
        loan_count: rows.len(),
        loans_in_arrears: rows.iter().filter(|r| r.weeks_without_payment > 0).count(),
        total_arrears: rows
            .iter()
            .fold(Decimal::ZERO, |acc, r| acc.saturating_add(r.arrears_amount)),
        total_abono: rows
            .iter()
            .fold(Decimal::ZERO, |acc, r| acc.saturating_add(r.abono_parcial_amount)),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "reference_date": now.format("%Y-%m-%dT%H:%M:%S").to_string(),
        "week_mode": mode,
        "utc_offset_minutes": ledger.config().utc_offset_minutes,
        "week_start": "monday",
    });

    Ok(with_metadata(
        "Weekly installment replay with surplus carry-forward",
        &assumptions,
        warnings,
        elapsed,
        CollectionListingOutput { rows, totals },
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
