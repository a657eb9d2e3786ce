pub mod coerce;
pub mod config;
pub mod error;
pub mod ledger;
pub mod loan;
pub mod timestamp;
pub mod types;
pub mod week;

#[cfg(feature = "cache")]
pub mod cache;

#[cfg(feature = "listing")]
pub mod listing;

pub use config::LedgerConfig;
pub use error::LedgerError;
pub use ledger::{
    expected_weekly_payment, AbonoParcialOutput, VdoOutput, WeekEvaluation, WeeklyPaymentLedger,
};
pub use loan::{Loan, LoanType, Payment};
pub use timestamp::Timestamp;
pub use types::*;
pub use week::WeekMode;

/// Standard result type for all loan-ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
