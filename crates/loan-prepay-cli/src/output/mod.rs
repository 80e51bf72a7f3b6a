pub mod csv_out;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => match serde_json::to_string_pretty(value) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("JSON serialization error: {}", e),
        },
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// The `result` of a computation envelope, or the value itself.
pub(crate) fn envelope_result(value: &Value) -> &Value {
    value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value)
}

/// A result split into dotted scalar fields and row sets (arrays of
/// objects such as the ledger, ranked scenarios or early-stop probes).
#[derive(Debug, Default)]
pub(crate) struct Flattened {
    pub fields: Vec<(String, String)>,
    pub row_sets: Vec<(String, Vec<Value>)>,
}

pub(crate) fn flatten(value: &Value) -> Flattened {
    let mut out = Flattened::default();
    flatten_into("", value, &mut out);
    out
}

fn flatten_into(prefix: &str, value: &Value, out: &mut Flattened) {
    match value {
        Value::Object(map) => {
            for (key, val) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_into(&path, val, out);
            }
        }
        Value::Array(items) if items.iter().any(Value::is_object) => {
            out.row_sets.push((prefix.to_string(), items.clone()));
        }
        other => {
            let key = if prefix.is_empty() { "value" } else { prefix };
            out.fields.push((key.to_string(), scalar(other)));
        }
    }
}

/// One row of a row set as (column, cell) pairs; nested row sets are
/// rendered inline as JSON.
pub(crate) fn flatten_row(item: &Value) -> Vec<(String, String)> {
    let flat = flatten(item);
    let mut cells = flat.fields;
    for (key, rows) in flat.row_sets {
        cells.push((key, serde_json::to_string(&rows).unwrap_or_default()));
    }
    cells
}

pub(crate) fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(items) => items.iter().map(scalar).collect::<Vec<_>>().join(", "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
