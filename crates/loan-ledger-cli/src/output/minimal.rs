use serde_json::Value;

use super::format_scalar;

/// Print just the key answer value from the output.
///
/// Looks for well-known result fields in order of priority, then falls back
/// to the first field of the result object. Listings answer with their totals.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);
    let result_obj = result_obj
        .as_object()
        .and_then(|m| m.get("totals"))
        .unwrap_or(result_obj);

    let priority_keys = [
        "arrears_amount",
        "total_arrears",
        "abono_parcial_amount",
        "expected_weekly_payment",
    ];

    if let Value::Object(map) = result_obj {
        for key in &priority_keys {
            if let Some(val) = map.get(*key) {
                if !val.is_null() {
                    println!("{}", format_scalar(val));
                    return;
                }
            }
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_scalar(val));
            return;
        }
    }

    if let Value::Array(weeks) = result_obj {
        // Replay: number of uncovered weeks.
        let missed = weeks
            .iter()
            .filter(|w| w.get("covered") == Some(&Value::Bool(false)))
            .count();
        println!("{}", missed);
        return;
    }

    println!("{}", format_scalar(result_obj));
}
