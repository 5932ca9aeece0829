use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use retail_dash::analytics::report::{build_report, DashboardReport, ReportOptions};
use retail_dash::data::export::export_csv;
use retail_dash::data::filter::{apply_filters, FilterSpec};
use retail_dash::data::model::TransactionTable;
use retail_dash::data::segment::{CustomerSegment, SegmentIndex};
use retail_dash::data::source::DataSource;

use crate::color::ColorMap;

/// Dashboard tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Trends,
    Products,
    Geography,
    Customers,
}

impl Tab {
    pub const ALL: [Tab; 4] = [Tab::Trends, Tab::Products, Tab::Geography, Tab::Customers];

    pub fn label(self) -> &'static str {
        match self {
            Tab::Trends => "📈 Trends",
            Tab::Products => "📦 Products",
            Tab::Geography => "🌍 Geography",
            Tab::Customers => "👥 Customers",
        }
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Where the dataset comes from; owns the cached table.
    pub source: DataSource,

    /// Loaded table (None until a file loads successfully).
    pub table: Option<Arc<TransactionTable>>,

    /// Segment facts over the loaded table.
    pub segments: SegmentIndex,

    /// Current filter selections.
    pub filters: FilterSpec,

    /// Chart choices (granularity, ranking, list lengths).
    pub options: ReportOptions,

    /// Everything the charts draw, rebuilt on every filter change.
    pub report: Option<DashboardReport>,

    /// Rows passing the current filters.
    pub visible_rows: usize,

    /// Products offered in the product picker (narrowed by country).
    pub product_options: BTreeSet<String>,

    /// Text typed into the product picker's search box.
    pub product_search: String,

    /// Stable colour per country.
    pub color_map: ColorMap,

    pub tab: Tab,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        Self {
            source: DataSource::new(data_path),
            table: None,
            segments: SegmentIndex::default(),
            filters: FilterSpec::default(),
            options: ReportOptions::default(),
            report: None,
            visible_rows: 0,
            product_options: BTreeSet::new(),
            product_search: String::new(),
            color_map: ColorMap::default(),
            tab: Tab::default(),
            status_message: None,
        }
    }

    /// Load the current source path, keeping the old table on failure.
    pub fn load(&mut self) {
        match self.source.table() {
            Ok(table) => self.set_table(table),
            Err(e) => self.status_message = Some(format!("Error: {e}")),
        }
    }

    /// Switch to another file. On failure the previous file stays current.
    pub fn open(&mut self, path: &Path) {
        let previous = self.source.path().to_path_buf();
        self.source.set_path(path);
        match self.source.table() {
            Ok(table) => self.set_table(table),
            Err(e) => {
                self.status_message = Some(format!("Error: {e}"));
                self.source.set_path(previous);
            }
        }
    }

    /// Re-read the file if it changed on disk; filters are kept.
    pub fn reload(&mut self) {
        match self.source.refresh() {
            Ok((table, true)) => {
                let filters = std::mem::take(&mut self.filters);
                self.set_table(table);
                self.filters = filters;
                self.refilter();
            }
            Ok((_, false)) => self.status_message = Some("Data file unchanged".into()),
            Err(e) => self.status_message = Some(format!("Error: {e}")),
        }
    }

    /// Ingest a newly loaded table, initialise filters and colours.
    pub fn set_table(&mut self, table: Arc<TransactionTable>) {
        self.segments = SegmentIndex::build(&table);
        self.filters = FilterSpec::for_table(&table);
        self.color_map = ColorMap::new(&table.countries);
        self.table = Some(table);
        self.status_message = None;
        self.refilter();
    }

    /// Recompute the report after a filter or option change.
    pub fn refilter(&mut self) {
        let Some(table) = &self.table else {
            return;
        };
        self.product_options = table.descriptions_in(&self.filters.countries);
        let view = apply_filters(table, &self.filters, &self.segments);
        log::debug!("{} of {} rows visible", view.len(), table.len());
        self.visible_rows = view.len();
        self.report = Some(build_report(&view, &self.filters, &self.options));
    }

    /// Toggle a single country in the selection.
    pub fn toggle_country(&mut self, country: &str) {
        toggle(&mut self.filters.countries, country);
        self.refilter();
    }

    /// Toggle a single product in the selection.
    pub fn toggle_product(&mut self, product: &str) {
        toggle(&mut self.filters.products, product);
        self.refilter();
    }

    /// Select every country explicitly.
    pub fn select_all_countries(&mut self) {
        if let Some(table) = &self.table {
            self.filters.countries = table.countries.clone();
        }
        self.refilter();
    }

    /// Clear a membership filter; an empty set means no restriction.
    pub fn clear_countries(&mut self) {
        self.filters.countries.clear();
        self.refilter();
    }

    pub fn clear_products(&mut self) {
        self.filters.products.clear();
        self.refilter();
    }

    pub fn set_segment(&mut self, segment: CustomerSegment) {
        if self.filters.customer_segment != segment {
            self.filters.customer_segment = segment;
            self.refilter();
        }
    }

    /// Back to the initial selection for the loaded table.
    pub fn reset_filters(&mut self) {
        if let Some(table) = &self.table {
            self.filters = FilterSpec::for_table(table);
        }
        self.product_search.clear();
        self.refilter();
    }

    /// Write the rows passing the current filters to `path`.
    pub fn export_to(&self, path: &Path) -> anyhow::Result<usize> {
        let table = self.table.as_ref().context("no dataset loaded")?;
        let view = apply_filters(table, &self.filters, &self.segments);
        export_csv(&view, path).with_context(|| format!("exporting to {}", path.display()))?;
        Ok(view.len())
    }
}

fn toggle(set: &mut BTreeSet<String>, value: &str) {
    if !set.remove(value) {
        set.insert(value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::{Builder, NamedTempFile};

    use super::*;

    fn data_file() -> NamedTempFile {
        let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(
            file,
            "InvoiceNo,StockCode,Description,Quantity,InvoiceDate,UnitPrice,CustomerID,Country"
        )
        .unwrap();
        writeln!(file, "1,A,MUG,5,2011-01-05 10:00:00,2.0,17850,United Kingdom").unwrap();
        writeln!(file, "2,B,LAMP,-3,2011-01-06 10:00:00,2.0,13047,France").unwrap();
        writeln!(file, "3,C,CANDLE,2,2011-01-07 10:00:00,1.0,17850,United Kingdom").unwrap();
        file
    }

    #[test]
    fn loading_starts_with_default_country() {
        let file = data_file();
        let mut state = AppState::new(file.path());
        state.load();

        assert!(state.status_message.is_none());
        assert_eq!(state.visible_rows, 2);
        let report = state.report.as_ref().unwrap();
        assert_eq!(report.kpis.total_sales, 12.0);
        assert!(!state.product_options.contains("LAMP"));
    }

    #[test]
    fn clearing_countries_shows_everything() {
        let file = data_file();
        let mut state = AppState::new(file.path());
        state.load();

        state.clear_countries();
        assert_eq!(state.visible_rows, 3);
        assert!(state.product_options.contains("LAMP"));

        state.toggle_country("France");
        assert_eq!(state.visible_rows, 1);
        state.toggle_product("MUG");
        assert_eq!(state.visible_rows, 0);
        assert!(state.report.as_ref().unwrap().is_empty());

        state.reset_filters();
        assert_eq!(state.visible_rows, 2);
    }

    #[test]
    fn segment_change_refilters() {
        let file = data_file();
        let mut state = AppState::new(file.path());
        state.load();
        state.set_segment(CustomerSegment::New);
        assert_eq!(state.visible_rows, 1);
        assert!(state.report.as_ref().unwrap().rfm.is_none());
    }

    #[test]
    fn export_writes_visible_rows() {
        let file = data_file();
        let mut state = AppState::new(file.path());
        state.load();

        let out = Builder::new().suffix(".csv").tempfile().unwrap();
        assert_eq!(state.export_to(out.path()).unwrap(), 2);
        let text = std::fs::read_to_string(out.path()).unwrap();
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn failed_open_keeps_previous_file() {
        let file = data_file();
        let mut state = AppState::new(file.path());
        state.load();

        state.open(Path::new("/no/such/other.csv"));
        assert!(state.status_message.as_ref().unwrap().contains("not found"));
        assert_eq!(state.source.path(), file.path());
        assert_eq!(state.table.as_ref().unwrap().len(), 3);
        assert_eq!(state.visible_rows, 2);
    }

    #[test]
    fn failed_load_sets_status() {
        let mut state = AppState::new("/no/such/data.csv");
        state.load();
        assert!(state.table.is_none());
        assert!(state.status_message.unwrap().contains("not found"));
    }
}
