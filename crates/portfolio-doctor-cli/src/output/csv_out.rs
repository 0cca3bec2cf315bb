use serde_json::Value;
use std::io;

use super::flatten;

/// Write output as a two-column `field,value` CSV to stdout.
///
/// Only the `result` section of an envelope is written; nested fields use
/// dotted names and list values are joined with `; `.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let body = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let _ = wtr.write_record(["field", "value"]);
    for (key, val) in flatten(body) {
        let _ = wtr.write_record([key.as_str(), &format_csv_value(&val)]);
    }

    let _ = wtr.flush();
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(arr) => arr.iter().map(format_csv_value).collect::<Vec<_>>().join("; "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
