use serde_json::Value;

use super::flatten;

/// Headline figure per command, in order of priority.
const PRIORITY_KEYS: [&str; 6] = [
    "diversification.score",
    "score",
    "median_return",
    "sharpe_ratio",
    "var_95",
    "volatility",
];

/// Print just the key answer value from the output.
///
/// Looks for a headline field among the flattened result keys, then falls
/// back to the first field.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if !result_obj.is_object() {
        println!("{}", format_minimal(result_obj));
        return;
    }

    let fields = flatten(result_obj);
    for key in PRIORITY_KEYS {
        if let Some((_, val)) = fields.iter().find(|(k, v)| k == key && !v.is_null()) {
            println!("{}", format_minimal(val));
            return;
        }
    }

    if let Some((key, val)) = fields.first() {
        println!("{}: {}", key, format_minimal(val));
    }
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
