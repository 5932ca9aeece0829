use std::io::Write;
use std::path::Path;

use super::loader::REQUIRED_COLUMNS;
use super::model::TableView;
use crate::error::ExportError;

/// Derived columns written after the source columns.
pub const DERIVED_COLUMNS: [&str; 6] = ["YearMonth", "Year", "Month", "Day", "Hour", "TotalPrice"];

/// Serialize the rows of `view` as CSV: a header, the source columns, then the
/// derived columns. The output loads back through the CSV loader.
pub fn write_csv<W: Write>(view: &TableView<'_>, out: W) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(REQUIRED_COLUMNS.iter().chain(DERIVED_COLUMNS.iter()))?;

    for tx in view.iter() {
        writer.write_record([
            tx.invoice_no().to_string(),
            tx.stock_code().to_string(),
            tx.description().to_string(),
            tx.quantity().to_string(),
            tx.invoice_date().format("%Y-%m-%d %H:%M:%S").to_string(),
            tx.unit_price().to_string(),
            tx.customer_id().unwrap_or("").to_string(),
            tx.country().to_string(),
            tx.year_month().to_string(),
            tx.year().to_string(),
            tx.month().name().to_string(),
            tx.weekday_name().to_string(),
            tx.hour().to_string(),
            tx.total_price().to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// The filtered table as CSV bytes, ready for a download/save dialog.
pub fn to_csv_bytes(view: &TableView<'_>) -> Result<Vec<u8>, ExportError> {
    let mut buf = Vec::new();
    write_csv(view, &mut buf)?;
    Ok(buf)
}

/// Write the filtered table to `path`, replacing any existing file.
pub fn export_csv(view: &TableView<'_>, path: &Path) -> Result<(), ExportError> {
    let file = std::fs::File::create(path)?;
    write_csv(view, std::io::BufWriter::new(file))?;
    log::info!("Exported {} rows to {}", view.len(), path.display());
    Ok(())
}
