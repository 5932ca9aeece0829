//! retail-dash: filter-driven sales analytics over a retail transactions file.
//!
//! The library is the dashboard's engine: it loads the dataset once, applies
//! filter selections as cheap row views and turns a view into KPIs and chart
//! tables. It never draws anything; the `retail-dash` binary renders the
//! results with egui.

pub mod analytics;
pub mod cli;
pub mod data;
pub mod error;

// Re-export public items for easier access
pub use analytics::report::{build_report, DashboardReport, ReportOptions};
pub use data::filter::{apply_filters, FilterSpec};
pub use data::model::{TableView, Transaction, TransactionTable};
pub use data::segment::{CustomerSegment, SegmentIndex};
pub use data::source::DataSource;
pub use error::{DataLoadError, ExportError};

/// Common result type used by the application layer.
pub type Result<T> = anyhow::Result<T>;
