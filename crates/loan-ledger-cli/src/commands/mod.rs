pub mod ledger;
pub mod listing;
