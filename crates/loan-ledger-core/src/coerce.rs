//! Lenient numeric coercion for loan records.
//!
//! Loan and payment records arrive from the persistence layer with amounts as
//! JSON numbers, numeric strings, `null`, or missing entirely. Everything that
//! does not parse as a number contributes zero instead of failing the
//! calculation.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::{Number, Value};
use std::str::FromStr;

/// Coerce an arbitrary JSON value to a Decimal, falling back to zero.
pub fn parse_or_zero(value: &Value) -> Decimal {
    match value {
        Value::Number(n) => number_to_decimal(n),
        Value::String(s) => str_to_decimal(s),
        _ => Decimal::ZERO,
    }
}

/// Parse a numeric string (plain or scientific notation). Blank or
/// non-numeric text is zero.
pub fn str_to_decimal(raw: &str) -> Decimal {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Decimal::ZERO;
    }
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .unwrap_or(Decimal::ZERO)
}

fn number_to_decimal(n: &Number) -> Decimal {
    if let Some(i) = n.as_i64() {
        return Decimal::from(i);
    }
    if let Some(u) = n.as_u64() {
        return Decimal::from(u);
    }
    // Go through the textual form first so 300.1 stays 300.1 rather than the
    // nearest binary float.
    let text = n.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
        .or_else(|| n.as_f64().and_then(Decimal::from_f64))
        .unwrap_or(Decimal::ZERO)
}

// ---------------------------------------------------------------------------
// serde helpers
// ---------------------------------------------------------------------------

/// `deserialize_with` helper: number, numeric string or anything else (as 0).
pub fn lenient_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(parse_or_zero).unwrap_or(Decimal::ZERO))
}

/// `deserialize_with` helper for whole counts such as a week duration.
/// Fractions are truncated; negatives and garbage become 0.
pub fn lenient_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .map(parse_or_zero)
        .and_then(|d| d.trunc().to_u32())
        .unwrap_or(0))
}

/// `deserialize_with` helper for identifiers stored either as strings or as
/// integers. Anything else is treated as absent.
pub fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// `deserialize_with` helper mapping an explicit `null` collection to empty.
pub fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
