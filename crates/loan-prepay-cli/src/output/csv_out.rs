use serde_json::Value;
use std::io;

use super::{envelope_result, flatten, flatten_row, Flattened};

/// Write output as CSV to stdout: the ledger (or the first other row set)
/// as rows, or the summary as field/value pairs when there is none.
pub fn print_csv(value: &Value) {
    let flat = flatten(envelope_result(value));
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let written = write_flattened(&mut wtr, &flat).and_then(|_| wtr.flush().map_err(csv::Error::from));
    if let Err(e) = written {
        eprintln!("CSV write error: {}", e);
    }
}

fn write_flattened<W: io::Write>(wtr: &mut csv::Writer<W>, flat: &Flattened) -> Result<(), csv::Error> {
    let rows = flat
        .row_sets
        .iter()
        .find(|(name, _)| name == "ledger")
        .or_else(|| flat.row_sets.first());

    match rows {
        Some((_, rows)) => write_rows(wtr, rows),
        None => {
            wtr.write_record(["field", "value"])?;
            for (key, val) in &flat.fields {
                wtr.write_record([key.as_str(), val.as_str()])?;
            }
            Ok(())
        }
    }
}

fn write_rows<W: io::Write>(wtr: &mut csv::Writer<W>, rows: &[Value]) -> Result<(), csv::Error> {
    let flattened: Vec<Vec<(String, String)>> = rows.iter().map(flatten_row).collect();
    let Some(first) = flattened.first() else {
        return Ok(());
    };
    let headers: Vec<&str> = first.iter().map(|(k, _)| k.as_str()).collect();
    wtr.write_record(&headers)?;
    for row in &flattened {
        let cells: Vec<&str> = headers
            .iter()
            .map(|h| {
                row.iter()
                    .find(|(k, _)| k == h)
                    .map_or("", |(_, v)| v.as_str())
            })
            .collect();
        wtr.write_record(&cells)?;
    }
    Ok(())
}
