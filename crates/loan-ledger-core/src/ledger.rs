//! Weekly-payment arrears (VDO) and advance credit (abono parcial).
//!
//! The ledger replays a loan's payment history week by week, from the week
//! the loan was signed up to a cutoff derived from the reference date,
//! carrying any surplus forward. The signing week never counts toward
//! arrears; whatever is paid in it becomes surplus. A shortfall resets the
//! surplus to zero instead of carrying negative credit into the next week.
//!
//! All operations are pure. Malformed numeric data has already been coerced
//! to zero by the input types, so nothing here can fail: money arithmetic
//! saturates at the bounds of `Decimal`, and dates at the edges of the
//! calendar yield no weeks.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::LedgerConfig;
use crate::loan::Loan;
use crate::types::Money;
use crate::week::{evaluation_cutoff, week_of, weeks_until, WeekBounds, WeekMode};

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// One week of the arrears replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekEvaluation {
    /// 0 is the signing week.
    pub index: u32,
    pub monday: NaiveDateTime,
    pub sunday: NaiveDateTime,
    /// Sum of payments bucketed into this week.
    pub paid: Money,
    /// Carried surplus plus `paid`.
    pub available: Money,
    pub covered: bool,
    pub surplus_after: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VdoOutput {
    pub expected_weekly_payment: Money,
    /// Weeks replayed, including the signing week.
    pub weeks_evaluated: u32,
    pub weeks_without_payment: u32,
    /// `weeks_without_payment * expected_weekly_payment`, capped at
    /// `pending_amount`.
    pub arrears_amount: Money,
    /// Surplus left after the last evaluated week.
    pub partial_payment: Money,
    pub total_debt: Money,
    pub total_paid: Money,
    pub pending_amount: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbonoParcialOutput {
    pub expected_weekly_payment: Money,
    pub total_paid_in_current_week: Money,
    pub abono_parcial_amount: Money,
}

// ---------------------------------------------------------------------------
// Loan-level figures
// ---------------------------------------------------------------------------

/// The installment a loan is expected to receive each week.
///
/// A positive stored value wins. Otherwise it is derived as
/// `requested_amount * (1 + rate) / week_duration`; a loan missing either
/// term expects nothing.
pub fn expected_weekly_payment(loan: &Loan) -> Money {
    if loan.expected_weekly_payment > Decimal::ZERO {
        return loan.expected_weekly_payment;
    }
    let weeks = loan.week_duration();
    if weeks == 0 || loan.requested_amount.is_zero() {
        return Decimal::ZERO;
    }
    total_debt(loan)
        .checked_div(Decimal::from(weeks))
        .unwrap_or(Decimal::ZERO)
}

/// Principal plus interest: `requested_amount * (1 + rate)`.
pub fn total_debt(loan: &Loan) -> Money {
    loan.requested_amount
        .saturating_mul(Decimal::ONE.saturating_add(loan.rate()))
}

/// Sum of every payment ever made, bucketed or not.
pub fn total_paid(loan: &Loan) -> Money {
    loan.payments
        .iter()
        .fold(Decimal::ZERO, |acc, p| acc.saturating_add(p.amount))
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Evaluates loans against the weekly payment schedule.
///
/// Reference dates passed to its methods are wall-clock times in the
/// configured zone; recorded timestamps on the loan are converted to that
/// zone before bucketing.
#[derive(Debug, Clone, Default)]
pub struct WeeklyPaymentLedger {
    config: LedgerConfig,
}

impl WeeklyPaymentLedger {
    pub fn new(config: LedgerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Replay the loan week by week up to the cutoff for `now` and `mode`.
    ///
    /// Returns an empty replay when the loan has no usable sign date.
    pub fn replay_weeks(
        &self,
        loan: &Loan,
        now: NaiveDateTime,
        mode: WeekMode,
    ) -> Vec<WeekEvaluation> {
        let Some(sign_date) = loan.sign_date.as_ref().map(|ts| self.config.localize(ts)) else {
            warn!(loan_id = ?loan.id, "loan has no parsable sign date; no weeks evaluated");
            return Vec::new();
        };

        let expected = expected_weekly_payment(loan);
        let payments = self.bucketed_payments(loan);
        let Some(cutoff) = evaluation_cutoff(now, mode) else {
            warn!(loan_id = ?loan.id, %now, "reference date out of range; no weeks evaluated");
            return Vec::new();
        };

        let mut surplus = Decimal::ZERO;
        let mut replay = Vec::new();

        for (index, week) in weeks_until(sign_date, cutoff).into_iter().enumerate() {
            let paid = paid_within(&payments, &week);

            if index == 0 {
                surplus = surplus.saturating_add(paid);
                replay.push(WeekEvaluation {
                    index: 0,
                    monday: week.monday,
                    sunday: week.sunday,
                    paid,
                    available: surplus,
                    covered: true,
                    surplus_after: surplus,
                });
                continue;
            }

            let available = surplus.max(Decimal::ZERO).saturating_add(paid);
            let covered = expected <= Decimal::ZERO || available >= expected;
            surplus = if available > expected {
                available.saturating_sub(expected)
            } else {
                Decimal::ZERO
            };

            replay.push(WeekEvaluation {
                index: index as u32,
                monday: week.monday,
                sunday: week.sunday,
                paid,
                available,
                covered,
                surplus_after: surplus,
            });
        }

        replay
    }

    /// Weeks of expected payment outstanding as of `now`, and what they are
    /// worth, bounded by what is still owed on the loan.
    pub fn calculate_vdo(&self, loan: &Loan, now: NaiveDateTime, mode: WeekMode) -> VdoOutput {
        let expected = expected_weekly_payment(loan);
        let replay = self.replay_weeks(loan, now, mode);

        let weeks_without_payment = replay.iter().filter(|w| !w.covered).count() as u32;
        let partial_payment = replay
            .last()
            .map_or(Decimal::ZERO, |w| w.surplus_after.max(Decimal::ZERO));

        let debt = total_debt(loan);
        let paid = total_paid(loan);
        let pending_amount = debt.saturating_sub(paid).max(Decimal::ZERO);
        let arrears_amount = Decimal::from(weeks_without_payment)
            .saturating_mul(expected)
            .min(pending_amount);

        debug!(
            loan_id = ?loan.id,
            %mode,
            weeks_evaluated = replay.len(),
            weeks_without_payment,
            %arrears_amount,
            "vdo evaluated"
        );

        VdoOutput {
            expected_weekly_payment: expected,
            weeks_evaluated: replay.len() as u32,
            weeks_without_payment,
            arrears_amount,
            partial_payment,
            total_debt: debt,
            total_paid: paid,
            pending_amount,
        }
    }

    /// Overpayment within the week containing `now`. Surplus carried from
    /// earlier weeks is not considered.
    pub fn calculate_abono_parcial(&self, loan: &Loan, now: NaiveDateTime) -> AbonoParcialOutput {
        let expected = expected_weekly_payment(loan);
        let paid = week_of(now).map_or(Decimal::ZERO, |week| {
            paid_within(&self.bucketed_payments(loan), &week)
        });
        let abono = paid.saturating_sub(expected).max(Decimal::ZERO);

        debug!(loan_id = ?loan.id, %paid, %abono, "abono parcial evaluated");

        AbonoParcialOutput {
            expected_weekly_payment: expected,
            total_paid_in_current_week: paid,
            abono_parcial_amount: abono,
        }
    }

    fn bucketed_payments(&self, loan: &Loan) -> Vec<(NaiveDateTime, Money)> {
        loan.payments
            .iter()
            .filter_map(|p| {
                p.bucket_timestamp()
                    .map(|ts| (self.config.localize(ts), p.amount))
            })
            .collect()
    }
}

fn paid_within(payments: &[(NaiveDateTime, Money)], week: &WeekBounds) -> Money {
    payments
        .iter()
        .filter(|(at, _)| week.contains(*at))
        .fold(Decimal::ZERO, |acc, (_, amount)| acc.saturating_add(*amount))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loan::{LoanType, Payment};
    use crate::timestamp::Timestamp;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn ts(s: &str) -> Timestamp {
        s.parse().unwrap()
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn weekly_loan(sign: &str, expected: Decimal, payments: &[(&str, Decimal)]) -> Loan {
        Loan {
            sign_date: Some(ts(sign)),
            requested_amount: dec!(10_000),
            loan_type: Some(LoanType {
                week_duration: 14,
                rate: dec!(0.4),
            }),
            expected_weekly_payment: expected,
            payments: payments
                .iter()
                .map(|(at, amount)| Payment::received(*amount, ts(at)))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_expected_payment_prefers_stored_value() {
        let loan = weekly_loan("2025-09-02", dec!(300), &[]);
        assert_eq!(expected_weekly_payment(&loan), dec!(300));
    }

    #[test]
    fn test_expected_payment_derived_from_terms() {
        let loan = Loan {
            requested_amount: dec!(3000),
            loan_type: Some(LoanType {
                week_duration: 14,
                rate: dec!(0.4),
            }),
            ..Default::default()
        };
        // 3000 * 1.4 / 14
        assert_eq!(expected_weekly_payment(&loan), dec!(300));
    }

    #[test]
    fn test_expected_payment_missing_terms() {
        let no_type = Loan {
            requested_amount: dec!(3000),
            ..Default::default()
        };
        assert_eq!(expected_weekly_payment(&no_type), Decimal::ZERO);

        let no_amount = Loan {
            loan_type: Some(LoanType {
                week_duration: 10,
                rate: dec!(0.2),
            }),
            ..Default::default()
        };
        assert_eq!(expected_weekly_payment(&no_amount), Decimal::ZERO);
    }

    #[test]
    fn test_signing_week_payment_becomes_surplus() {
        // Signed Monday 2024-01-01, pays 700 on signing day.
        let loan = weekly_loan("2024-01-01", dec!(350), &[("2024-01-02", dec!(700))]);
        let replay = WeeklyPaymentLedger::default().replay_weeks(
            &loan,
            day(2024, 1, 24),
            WeekMode::Current,
        );

        assert_eq!(replay.len(), 3);
        assert!(replay[0].covered);
        assert_eq!(replay[0].surplus_after, dec!(700));
        assert!(replay[1].covered);
        assert_eq!(replay[1].surplus_after, dec!(350));
        assert!(replay[2].covered);
        assert_eq!(replay[2].surplus_after, dec!(0));
    }

    #[test]
    fn test_deficit_is_not_carried_forward() {
        // Week 1 pays 100 of 300, week 2 pays exactly 300.
        let loan = weekly_loan(
            "2025-09-02",
            dec!(300),
            &[("2025-09-09", dec!(100)), ("2025-09-16", dec!(300))],
        );
        let replay = WeeklyPaymentLedger::default().replay_weeks(
            &loan,
            day(2025, 9, 24),
            WeekMode::Current,
        );

        assert_eq!(replay.len(), 3);
        assert!(!replay[1].covered);
        assert_eq!(replay[1].surplus_after, dec!(0));
        assert!(replay[2].covered, "a fully paid week must not be flagged");
    }

    #[test]
    fn test_zero_expected_payment_has_no_arrears() {
        let loan = Loan {
            sign_date: Some(ts("2025-01-06")),
            ..Default::default()
        };
        let vdo = WeeklyPaymentLedger::default().calculate_vdo(
            &loan,
            day(2025, 3, 1),
            WeekMode::Next,
        );
        assert_eq!(vdo.expected_weekly_payment, dec!(0));
        assert_eq!(vdo.weeks_without_payment, 0);
        assert_eq!(vdo.arrears_amount, dec!(0));
    }

    #[test]
    fn test_missing_sign_date_yields_zero() {
        let mut loan = weekly_loan("2025-01-06", dec!(300), &[("2025-01-14", dec!(300))]);
        loan.sign_date = None;
        let vdo = WeeklyPaymentLedger::default().calculate_vdo(
            &loan,
            day(2025, 3, 1),
            WeekMode::Current,
        );
        assert_eq!(vdo.weeks_evaluated, 0);
        assert_eq!(vdo.weeks_without_payment, 0);
        assert_eq!(vdo.arrears_amount, dec!(0));
        assert_eq!(vdo.total_paid, dec!(300));
    }

    #[test]
    fn test_arrears_capped_by_pending_debt() {
        // Owes 1000 in total, has paid 900, misses many weeks.
        let loan = Loan {
            sign_date: Some(ts("2025-01-06")),
            requested_amount: dec!(1000),
            expected_weekly_payment: dec!(100),
            payments: vec![Payment::received(dec!(900), ts("2025-01-07"))],
            ..Default::default()
        };
        let vdo = WeeklyPaymentLedger::default().calculate_vdo(
            &loan,
            day(2025, 6, 1),
            WeekMode::Current,
        );
        assert!(vdo.weeks_without_payment > 1);
        assert_eq!(vdo.pending_amount, dec!(100));
        assert_eq!(vdo.arrears_amount, dec!(100));
    }

    #[test]
    fn test_payments_outside_replay_still_reduce_pending() {
        let loan = weekly_loan(
            "2025-09-02",
            dec!(300),
            &[("2025-08-01", dec!(50)), ("2030-01-01", dec!(25))],
        );
        let vdo = WeeklyPaymentLedger::default().calculate_vdo(
            &loan,
            day(2025, 9, 10),
            WeekMode::Current,
        );
        assert_eq!(vdo.total_paid, dec!(75));
        assert_eq!(vdo.pending_amount, dec!(14_000) - dec!(75));
        assert_eq!(vdo.partial_payment, dec!(0));
    }

    #[test]
    fn test_partial_payment_reports_residual_surplus() {
        let loan = weekly_loan("2025-09-02", dec!(300), &[("2025-09-09", dec!(500))]);
        let vdo = WeeklyPaymentLedger::default().calculate_vdo(
            &loan,
            day(2025, 9, 17),
            WeekMode::Current,
        );
        assert_eq!(vdo.weeks_without_payment, 0);
        assert_eq!(vdo.partial_payment, dec!(200));
    }

    #[test]
    fn test_abono_parcial_current_week_only() {
        let loan = weekly_loan(
            "2025-09-02",
            dec!(300),
            &[("2025-09-09", dec!(900)), ("2025-09-16", dec!(450))],
        );
        let abono = WeeklyPaymentLedger::default().calculate_abono_parcial(&loan, day(2025, 9, 19));
        assert_eq!(abono.total_paid_in_current_week, dec!(450));
        assert_eq!(abono.abono_parcial_amount, dec!(150));
    }

    #[test]
    fn test_amounts_at_decimal_bounds_saturate() {
        let max = Decimal::MAX;
        let loan = weekly_loan(
            "2025-09-02",
            dec!(300),
            &[("2025-09-09", max), ("2025-09-10", max), ("2025-09-17", max)],
        );
        let ledger = WeeklyPaymentLedger::default();
        let now = day(2025, 9, 18);

        let replay = ledger.replay_weeks(&loan, now, WeekMode::Next);
        assert!(replay.iter().all(|w| w.covered));
        assert_eq!(replay[1].paid, max);

        let vdo = ledger.calculate_vdo(&loan, now, WeekMode::Next);
        assert_eq!(vdo.weeks_without_payment, 0);
        assert_eq!(vdo.total_paid, max);
        assert_eq!(vdo.pending_amount, dec!(0));

        let abono = ledger.calculate_abono_parcial(&loan, now);
        assert_eq!(abono.total_paid_in_current_week, max);
        assert_eq!(abono.abono_parcial_amount, max - dec!(300));
    }

    #[test]
    fn test_negative_amounts_saturate() {
        let loan = Loan {
            sign_date: Some(ts("2025-09-02")),
            requested_amount: Decimal::MAX,
            expected_weekly_payment: Decimal::MAX,
            payments: vec![
                Payment::received(Decimal::MIN, ts("2025-09-09")),
                Payment::received(Decimal::MIN, ts("2025-09-10")),
            ],
            ..Default::default()
        };
        let ledger = WeeklyPaymentLedger::default();
        let now = day(2025, 9, 11);

        let vdo = ledger.calculate_vdo(&loan, now, WeekMode::Next);
        assert_eq!(vdo.total_paid, Decimal::MIN);
        assert_eq!(vdo.pending_amount, Decimal::MAX);
        assert_eq!(vdo.weeks_without_payment, 1);
        assert_eq!(vdo.arrears_amount, Decimal::MAX);

        let abono = ledger.calculate_abono_parcial(&loan, now);
        assert_eq!(abono.total_paid_in_current_week, Decimal::MIN);
        assert_eq!(abono.abono_parcial_amount, dec!(0));
    }

    #[test]
    fn test_sign_date_at_end_of_calendar_yields_no_weeks() {
        let loan: Loan = serde_json::from_value(serde_json::json!({
            "signDate": 8_210_266_876_799_999_i64,
            "expectedWeeklyPayment": 300,
            "requestedAmount": 5000,
        }))
        .unwrap();
        assert!(loan.sign_date.is_some());

        let ledger = WeeklyPaymentLedger::default();
        let vdo = ledger.calculate_vdo(&loan, day(2025, 9, 18), WeekMode::Next);
        assert_eq!(vdo.weeks_evaluated, 0);
        assert_eq!(vdo.arrears_amount, dec!(0));

        let far = NaiveDateTime::MAX;
        assert!(ledger.replay_weeks(&loan, far, WeekMode::Current).is_empty());
        assert_eq!(ledger.calculate_abono_parcial(&loan, far).abono_parcial_amount, dec!(0));
    }

    #[test]
    fn test_offset_moves_payment_between_weeks() {
        // 03:00 UTC Monday is Sunday evening at UTC-6.
        let loan = Loan {
            sign_date: Some(ts("2025-09-02T12:00:00Z")),
            expected_weekly_payment: dec!(300),
            requested_amount: dec!(5000),
            payments: vec![Payment::received(dec!(300), ts("2025-09-15T03:00:00Z"))],
            ..Default::default()
        };

        let utc = WeeklyPaymentLedger::default();
        let mexico = WeeklyPaymentLedger::new(LedgerConfig {
            utc_offset_minutes: -360,
            ..Default::default()
        });

        let now = day(2025, 9, 18);
        assert_eq!(
            utc.calculate_abono_parcial(&loan, now).total_paid_in_current_week,
            dec!(300)
        );
        assert_eq!(
            mexico.calculate_abono_parcial(&loan, now).total_paid_in_current_week,
            dec!(0)
        );
    }
}
