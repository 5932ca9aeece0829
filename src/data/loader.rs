use std::path::Path;

use arrow::array::Array;
use arrow::util::display::array_value_to_string;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Transaction, TransactionTable};
use crate::error::DataLoadError;

/// Columns every input file must provide, in the order [`parse_fields`] expects.
pub const REQUIRED_COLUMNS: [&str; 8] = [
    "InvoiceNo",
    "StockCode",
    "Description",
    "Quantity",
    "InvoiceDate",
    "UnitPrice",
    "CustomerID",
    "Country",
];

const INVOICE_NO: usize = 0;
const STOCK_CODE: usize = 1;
const DESCRIPTION: usize = 2;
const QUANTITY: usize = 3;
const INVOICE_DATE: usize = 4;
const UNIT_PRICE: usize = 5;
const CUSTOMER_ID: usize = 6;
const COUNTRY: usize = 7;

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a transaction table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row; columns beyond [`REQUIRED_COLUMNS`] are ignored
/// * `.json`    – `[{ "InvoiceNo": ..., "Quantity": ..., ... }, ...]`
/// * `.parquet` – one column per field, any Arrow type with a text rendering
///
/// Derived columns are populated as each row is built. Any bad row aborts the
/// whole load.
pub fn load_file(path: &Path) -> Result<TransactionTable, DataLoadError> {
    if !path.is_file() {
        return Err(DataLoadError::NotFound(path.to_path_buf()));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let rows = match ext.as_str() {
        "csv" => load_csv(path)?,
        "json" => load_json(path)?,
        "parquet" | "pq" => load_parquet(path)?,
        other => return Err(DataLoadError::UnsupportedExtension(other.to_string())),
    };

    Ok(TransactionTable::from_rows(rows))
}

/// Parse CSV text already in memory (same layout as a `.csv` file).
pub fn load_csv_reader<R: std::io::Read>(source: R) -> Result<TransactionTable, DataLoadError> {
    let reader = csv::Reader::from_reader(source);
    read_csv(reader).map(TransactionTable::from_rows)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> Result<Vec<Transaction>, DataLoadError> {
    let reader = csv::Reader::from_path(path)?;
    read_csv(reader)
}

fn read_csv<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Vec<Transaction>, DataLoadError> {
    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
    let columns = locate_columns(|name| headers.iter().position(|h| h == name))?;

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result?;
        let fields = columns.map(|idx| record.get(idx).unwrap_or(""));
        rows.push(parse_fields(row_no, fields)?);
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, the default `df.to_json(orient='records')`.
fn load_json(path: &Path) -> Result<Vec<Transaction>, DataLoadError> {
    let text = std::fs::read_to_string(path)?;
    let root: JsonValue = serde_json::from_str(&text)?;

    let records = root
        .as_array()
        .ok_or_else(|| DataLoadError::Malformed("expected top-level JSON array".into()))?;

    let mut rows = Vec::with_capacity(records.len());
    for (row_no, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .ok_or_else(|| DataLoadError::Malformed(format!("row {row_no} is not a JSON object")))?;

        let mut texts: [String; 8] = Default::default();
        for (i, name) in REQUIRED_COLUMNS.into_iter().enumerate() {
            let value = obj.get(name).ok_or(DataLoadError::MissingColumn(name))?;
            texts[i] = match value {
                JsonValue::Number(n) if i == INVOICE_DATE => epoch_millis_to_text(n),
                other => json_to_text(other),
            };
        }
        let fields = [0, 1, 2, 3, 4, 5, 6, 7].map(|i| texts[i].as_str());
        rows.push(parse_fields(row_no, fields)?);
    }
    Ok(rows)
}

fn json_to_text(val: &JsonValue) -> String {
    match val {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

/// pandas writes datetimes in records JSON as Unix epoch milliseconds.
fn epoch_millis_to_text(n: &serde_json::Number) -> String {
    n.as_i64()
        .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
        .and_then(DateTime::from_timestamp_millis)
        .map(|d| d.naive_utc().format("%Y-%m-%d %H:%M:%S%.f").to_string())
        .unwrap_or_else(|| n.to_string())
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`); timestamp columns are rendered as ISO
/// text and parsed like CSV values.
fn load_parquet(path: &Path) -> Result<Vec<Transaction>, DataLoadError> {
    let file = std::fs::File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    // Checked up front so files with no row groups still need every column.
    let columns = locate_columns(|name| builder.schema().index_of(name).ok())?;
    let reader = builder.build()?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result?;
        let arrays = columns.map(|idx| batch.column(idx).clone());

        for row in 0..batch.num_rows() {
            let mut texts: [String; 8] = Default::default();
            for (slot, array) in texts.iter_mut().zip(&arrays) {
                if !array.is_null(row) {
                    *slot = array_value_to_string(array.as_ref(), row)?;
                }
            }
            let fields = [0, 1, 2, 3, 4, 5, 6, 7].map(|i| texts[i].as_str());
            rows.push(parse_fields(rows.len(), fields)?);
        }
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Shared row parsing
// ---------------------------------------------------------------------------

fn locate_columns<F>(mut find: F) -> Result<[usize; 8], DataLoadError>
where
    F: FnMut(&str) -> Option<usize>,
{
    let mut out = [0usize; 8];
    for (slot, name) in out.iter_mut().zip(REQUIRED_COLUMNS) {
        *slot = find(name).ok_or(DataLoadError::MissingColumn(name))?;
    }
    Ok(out)
}

/// Build one [`Transaction`] from its text fields, ordered as [`REQUIRED_COLUMNS`].
fn parse_fields(row: usize, fields: [&str; 8]) -> Result<Transaction, DataLoadError> {
    let invalid = |column: usize| DataLoadError::InvalidValue {
        row,
        column: REQUIRED_COLUMNS[column],
        value: fields[column].to_string(),
    };

    let quantity = parse_quantity(fields[QUANTITY]).ok_or_else(|| invalid(QUANTITY))?;
    let unit_price = fields[UNIT_PRICE]
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite() && *p >= 0.0)
        .ok_or_else(|| invalid(UNIT_PRICE))?;
    let invoice_date = parse_timestamp(fields[INVOICE_DATE]).ok_or_else(|| invalid(INVOICE_DATE))?;

    let invoice_no = fields[INVOICE_NO].trim();
    if invoice_no.is_empty() {
        return Err(invalid(INVOICE_NO));
    }

    Ok(Transaction::new(
        invoice_no,
        fields[STOCK_CODE].trim(),
        fields[DESCRIPTION].trim(),
        quantity,
        unit_price,
        parse_customer_id(fields[CUSTOMER_ID]),
        fields[COUNTRY].trim(),
        invoice_date,
    ))
}

/// Integers, or floats with no fractional part (`"6.0"` as pandas writes them).
fn parse_quantity(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(i) = s.parse::<i64>() {
        return Some(i);
    }
    let f = s.parse::<f64>().ok()?;
    (f.is_finite() && f.fract() == 0.0).then_some(f as i64)
}

fn parse_customer_id(s: &str) -> Option<String> {
    let s = s.trim();
    match s {
        "" | "nan" | "NaN" | "None" | "null" => None,
        other => Some(other.to_string()),
    }
}

/// Parse an ISO-style timestamp. Offsets are dropped and the wall-clock time
/// kept; a bare date means midnight.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    for fmt in TIMESTAMP_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
