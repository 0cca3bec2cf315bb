pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Flatten nested objects into dotted keys, e.g. `risk_profile.beta`.
///
/// Arrays and scalars are leaves; key order follows the JSON object.
pub fn flatten(value: &Value) -> Vec<(String, Value)> {
    let mut out = Vec::new();
    flatten_into("", value, &mut out);
    out
}

fn flatten_into(prefix: &str, value: &Value, out: &mut Vec<(String, Value)>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, val) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_into(&path, val, out);
            }
        }
        _ => out.push((prefix.to_string(), value.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_nested_result() {
        let v = json!({
            "risk_profile": {"beta": 1.0, "volatility": 0.2},
            "sector_alerts": ["High exposure to Tech: 55.0%"],
            "correlation_matrix": {"AAA": {"AAA": 1.0}}
        });
        let keys: Vec<String> = flatten(&v).into_iter().map(|(k, _)| k).collect();
        assert!(keys.contains(&"risk_profile.beta".to_string()));
        assert!(keys.contains(&"sector_alerts".to_string()));
        assert!(keys.contains(&"correlation_matrix.AAA.AAA".to_string()));
    }
}
