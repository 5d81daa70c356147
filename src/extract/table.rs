use std::io::{Read, Write};
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};

use super::{extract, BinRecord, HistogramKind};
use crate::error::{HistError, Result};
use crate::source::BinnedHistogram;

// ---------------------------------------------------------------------------
// Table – header + ordered bin records
// ---------------------------------------------------------------------------

/// Extracted bins of one histogram, ready to be written as text.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub kind: HistogramKind,
    pub records: Vec<BinRecord>,
}

impl Table {
    pub fn from_histogram(hist: &dyn BinnedHistogram) -> Result<Self> {
        let records = extract(hist)?;
        Ok(Table {
            kind: HistogramKind::of(hist),
            records,
        })
    }

    pub fn header(&self) -> &'static [&'static str] {
        self.kind.header()
    }
}

/// Shortest representation that parses back to the same value; integral
/// values keep a trailing `.0`.
fn format_value(v: f64) -> String {
    format!("{v:?}")
}

/// Write `table` as tab-separated text: one header line, one line per record.
pub fn write_table<W: Write>(table: &Table, writer: W) -> Result<()> {
    let mut wtr = WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(writer);

    wtr.write_record(table.header())?;
    for record in &table.records {
        wtr.write_record(record.fields().into_iter().map(format_value))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write `table` to `path`, replacing any previous file of that name.
pub fn save_table(table: &Table, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_table(table, std::io::BufWriter::new(file))
}

/// Parse a table produced by [`write_table`].
pub fn read_table<R: Read>(reader: R) -> Result<Table> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let kind = [HistogramKind::OneDimensional, HistogramKind::TwoDimensional]
        .into_iter()
        .find(|k| k.header() == headers.as_slice())
        .ok_or_else(|| HistError::Table {
            message: format!("unrecognized header {headers:?}"),
        })?;

    let mut records = Vec::new();
    for (row_no, result) in rdr.records().enumerate() {
        let row = result?;
        let values = row
            .iter()
            .enumerate()
            .map(|(col, tok)| {
                tok.trim().parse::<f64>().map_err(|_| HistError::Table {
                    message: format!("row {row_no}, column {col}: '{tok}' is not a number"),
                })
            })
            .collect::<Result<Vec<f64>>>()?;

        let record = match (kind, values.as_slice()) {
            (HistogramKind::OneDimensional, &[center, content, error]) => BinRecord::OneD {
                center,
                content,
                error,
            },
            (HistogramKind::TwoDimensional, &[x, y, content, error]) => BinRecord::TwoD {
                x,
                y,
                content,
                error,
            },
            _ => {
                return Err(HistError::Table {
                    message: format!("row {row_no} has {} columns", values.len()),
                })
            }
        };
        records.push(record);
    }

    Ok(Table { kind, records })
}
