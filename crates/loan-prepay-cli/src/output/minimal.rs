use serde_json::Value;

use super::{envelope_result, scalar};

/// Headline value per command, tried in order (JSON pointers into `result`).
const HEADLINES: [&str; 6] = [
    "/outcome/savings",
    "/scenarios/0/savings",
    "/best_savings/savings",
    "/recommended/stop_month",
    "/total_paid",
    "/eligible",
];

/// Print just the key answer value from the output.
pub fn print_minimal(value: &Value) {
    println!("{}", headline(envelope_result(value)));
}

fn headline(result: &Value) -> String {
    HEADLINES
        .iter()
        .filter_map(|pointer| result.pointer(pointer))
        .find(|v| !v.is_null())
        .map(scalar)
        .unwrap_or_else(|| match result {
            Value::Object(map) => map
                .iter()
                .next()
                .map(|(k, v)| format!("{}: {}", k, scalar(v)))
                .unwrap_or_default(),
            other => scalar(other),
        })
}
