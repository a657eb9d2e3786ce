use serde::{Deserialize, Serialize};

use crate::coerce::{lenient_count, lenient_decimal, lenient_id, null_as_empty};
use crate::timestamp::{lenient_timestamp, Timestamp};
use crate::types::{Money, Rate};

/// A loan record as fetched by the report endpoints, with its payment history.
///
/// Field names follow the persistence layer's wire shape (`signDate`,
/// `loantype`, ...). Numeric fields are coerced leniently and timestamps that
/// fail to parse are `None`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    #[serde(default, deserialize_with = "lenient_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub borrower: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub sign_date: Option<Timestamp>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub requested_amount: Money,
    #[serde(default, rename = "loantype", alias = "loanType")]
    pub loan_type: Option<LoanType>,
    /// Stored installment; when positive it overrides the derived one.
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub expected_weekly_payment: Money,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub payments: Vec<Payment>,
    #[serde(default, deserialize_with = "lenient_timestamp", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanType {
    /// Number of weekly installments.
    #[serde(default, deserialize_with = "lenient_count")]
    pub week_duration: u32,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub rate: Rate,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub amount: Money,
    #[serde(default, deserialize_with = "lenient_timestamp", skip_serializing_if = "Option::is_none")]
    pub received_at: Option<Timestamp>,
    #[serde(default, deserialize_with = "lenient_timestamp", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
}

impl Payment {
    pub fn received(amount: Money, received_at: Timestamp) -> Self {
        Self {
            amount,
            received_at: Some(received_at),
            created_at: None,
        }
    }

    /// Timestamp used to place the payment in a week: `receivedAt`, else
    /// `createdAt`. Payments with neither are never bucketed.
    pub fn bucket_timestamp(&self) -> Option<&Timestamp> {
        self.received_at.as_ref().or(self.created_at.as_ref())
    }
}

impl Loan {
    pub fn week_duration(&self) -> u32 {
        self.loan_type.as_ref().map_or(0, |t| t.week_duration)
    }

    pub fn rate(&self) -> Rate {
        self.loan_type.as_ref().map_or(Rate::ZERO, |t| t.rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_wire_shape() {
        let loan: Loan = serde_json::from_value(json!({
            "id": "cl-001",
            "signDate": "2025-09-02T00:00:00.000Z",
            "requestedAmount": "3000",
            "loantype": { "weekDuration": 14, "rate": "0.4" },
            "payments": [
                { "amount": 300, "receivedAt": "2025-09-16T12:00:00.000Z" },
                { "amount": "300", "createdAt": "2025-09-23T12:00:00.000Z" }
            ]
        }))
        .unwrap();

        assert_eq!(loan.id.as_deref(), Some("cl-001"));
        assert!(loan.sign_date.is_some());
        assert_eq!(loan.requested_amount, dec!(3000));
        assert_eq!(loan.week_duration(), 14);
        assert_eq!(loan.rate(), dec!(0.4));
        assert_eq!(loan.expected_weekly_payment, dec!(0));
        assert_eq!(loan.payments.len(), 2);
        assert_eq!(loan.payments[1].amount, dec!(300));
    }

    #[test]
    fn test_degenerate_record_does_not_fail() {
        let loan: Loan = serde_json::from_value(json!({
            "signDate": "garbage",
            "requestedAmount": null,
            "loantype": null,
            "expectedWeeklyPayment": "n/a",
            "payments": null
        }))
        .unwrap();

        assert!(loan.sign_date.is_none());
        assert_eq!(loan.requested_amount, dec!(0));
        assert_eq!(loan.week_duration(), 0);
        assert_eq!(loan.rate(), dec!(0));
        assert!(loan.payments.is_empty());
    }

    #[test]
    fn test_bucket_timestamp_prefers_received_at() {
        let p: Payment = serde_json::from_value(json!({
            "amount": 100,
            "receivedAt": "2025-09-16",
            "createdAt": "2025-09-20"
        }))
        .unwrap();
        assert_eq!(p.bucket_timestamp(), p.received_at.as_ref());

        let p: Payment =
            serde_json::from_value(json!({"amount": 100, "createdAt": "2025-09-20"})).unwrap();
        assert_eq!(p.bucket_timestamp(), p.created_at.as_ref());

        let p: Payment = serde_json::from_value(json!({"amount": 100})).unwrap();
        assert!(p.bucket_timestamp().is_none());
    }
}
