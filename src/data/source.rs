use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use super::loader::load_file;
use super::model::TransactionTable;
use crate::error::DataLoadError;

// ---------------------------------------------------------------------------
// DataSource – caller-owned handle over one input file
// ---------------------------------------------------------------------------

/// Size and modification time of the file the cached table came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    len: u64,
    modified: Option<SystemTime>,
}

impl Fingerprint {
    fn of(path: &Path) -> Option<Self> {
        let meta = std::fs::metadata(path).ok()?;
        Some(Fingerprint {
            len: meta.len(),
            modified: meta.modified().ok(),
        })
    }
}

#[derive(Debug)]
struct Cached {
    table: Arc<TransactionTable>,
    fingerprint: Option<Fingerprint>,
}

/// Loads a dataset once and hands out the shared, read-only table.
///
/// The cache is dropped when the path changes or on [`DataSource::invalidate`];
/// [`DataSource::refresh`] also reloads when the file on disk changed.
#[derive(Debug)]
pub struct DataSource {
    path: PathBuf,
    cached: Option<Cached>,
}

impl DataSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Point at another file. Dropping the cache only if the path differs.
    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if path != self.path {
            self.path = path;
            self.invalidate();
        }
    }

    pub fn invalidate(&mut self) {
        if self.cached.take().is_some() {
            log::debug!("Dropped cached table for {}", self.path.display());
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.cached.is_some()
    }

    /// The loaded table, reading the file only on first use.
    pub fn table(&mut self) -> Result<Arc<TransactionTable>, DataLoadError> {
        if let Some(cached) = &self.cached {
            return Ok(Arc::clone(&cached.table));
        }
        self.load()
    }

    /// Reload if the file changed since it was cached. The flag is `true`
    /// when a new table was read.
    pub fn refresh(&mut self) -> Result<(Arc<TransactionTable>, bool), DataLoadError> {
        if let Some(cached) = &self.cached {
            if cached.fingerprint.is_some() && cached.fingerprint == Fingerprint::of(&self.path) {
                return Ok((Arc::clone(&cached.table), false));
            }
            log::info!("{} changed on disk, reloading", self.path.display());
        }
        self.cached = None;
        self.load().map(|table| (table, true))
    }

    fn load(&mut self) -> Result<Arc<TransactionTable>, DataLoadError> {
        let fingerprint = Fingerprint::of(&self.path);
        let table = match load_file(&self.path) {
            Ok(table) => Arc::new(table),
            Err(e) => {
                log::error!("Failed to load {}: {e}", self.path.display());
                return Err(e);
            }
        };
        log::info!(
            "Loaded {} transactions from {} ({} countries, {} products)",
            table.len(),
            self.path.display(),
            table.countries.len(),
            table.descriptions.len()
        );
        self.cached = Some(Cached {
            table: Arc::clone(&table),
            fingerprint,
        });
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::Builder;

    use super::*;

    const HEADER: &str =
        "InvoiceNo,StockCode,Description,Quantity,InvoiceDate,UnitPrice,CustomerID,Country";

    fn write_csv(path: &Path, rows: &[&str]) {
        let mut file = std::fs::File::create(path).unwrap();
        writeln!(file, "{HEADER}").unwrap();
        for row in rows {
            writeln!(file, "{row}").unwrap();
        }
    }

    #[test]
    fn repeated_calls_share_one_table() {
        let file = Builder::new().suffix(".csv").tempfile().unwrap();
        write_csv(file.path(), &["1,A,MUG,1,2011-01-01 10:00:00,1.0,1,UK"]);

        let mut source = DataSource::new(file.path());
        assert!(!source.is_loaded());
        let a = source.table().unwrap();
        let b = source.table().unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let (c, reloaded) = source.refresh().unwrap();
        assert!(!reloaded);
        assert!(Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn refresh_reloads_changed_file() {
        let file = Builder::new().suffix(".csv").tempfile().unwrap();
        write_csv(file.path(), &["1,A,MUG,1,2011-01-01 10:00:00,1.0,1,UK"]);
        let mut source = DataSource::new(file.path());
        assert_eq!(source.table().unwrap().len(), 1);

        write_csv(
            file.path(),
            &[
                "1,A,MUG,1,2011-01-01 10:00:00,1.0,1,UK",
                "2,B,CUP,2,2011-01-02 10:00:00,3.0,2,UK",
            ],
        );
        let (table, reloaded) = source.refresh().unwrap();
        assert!(reloaded);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn changing_path_invalidates() {
        let first = Builder::new().suffix(".csv").tempfile().unwrap();
        let second = Builder::new().suffix(".csv").tempfile().unwrap();
        write_csv(first.path(), &["1,A,MUG,1,2011-01-01 10:00:00,1.0,1,UK"]);
        write_csv(second.path(), &[]);

        let mut source = DataSource::new(first.path());
        source.table().unwrap();
        source.set_path(first.path());
        assert!(source.is_loaded());

        source.set_path(second.path());
        assert!(!source.is_loaded());
        assert!(source.table().unwrap().is_empty());
    }

    #[test]
    fn failed_load_caches_nothing() {
        let mut source = DataSource::new("/no/such/file.csv");
        assert!(matches!(source.table(), Err(DataLoadError::NotFound(_))));
        assert!(!source.is_loaded());
    }
}
