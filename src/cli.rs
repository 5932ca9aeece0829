//! Command-line interface definitions and the headless report/export mode.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Parser;

use crate::analytics::report::{build_report, ProductRanking, ReportOptions, TrendGranularity};
use crate::data::export::{export_csv, write_csv};
use crate::data::filter::{apply_filters, FilterSpec};
use crate::data::segment::SegmentIndex;
use crate::data::source::DataSource;

/// Retail sales dashboard over a cleaned transactions file
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the transactions file (.csv, .json or .parquet)
    #[arg(short, long, default_value = "output/cleaned_online_retail.csv")]
    pub data: PathBuf,

    /// JSON file with filter settings (date_range, countries, products,
    /// customer_segment, quantity_range, price_range, customer_search)
    #[arg(short, long)]
    pub filters: Option<PathBuf>,

    /// Print the dashboard report as JSON instead of opening the window
    #[arg(long)]
    pub report: bool,

    /// Write the filtered rows to this CSV file instead of opening the window
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Time bucket for the sales trend
    #[arg(long, value_enum, default_value_t = TrendGranularity::Daily)]
    pub granularity: TrendGranularity,

    /// Ranking used for the top products chart
    #[arg(long, value_enum, default_value_t = ProductRanking::Revenue)]
    pub rank_by: ProductRanking,
}

impl Args {
    /// Whether the run should skip the GUI.
    pub fn is_headless(&self) -> bool {
        self.report || self.export.is_some()
    }

    pub fn report_options(&self) -> ReportOptions {
        ReportOptions {
            granularity: self.granularity,
            ranking: self.rank_by,
            ..Default::default()
        }
    }

    /// Filters from `--filters`, or no restriction when absent.
    pub fn filter_spec(&self) -> crate::Result<FilterSpec> {
        match &self.filters {
            Some(path) => load_filter_spec(path),
            None => Ok(FilterSpec::default()),
        }
    }
}

pub fn load_filter_spec(path: &Path) -> crate::Result<FilterSpec> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading filter file {}", path.display()))?;
    let spec = serde_json::from_str(&text)
        .with_context(|| format!("parsing filter file {}", path.display()))?;
    Ok(spec)
}

/// Load, filter, then print the report and/or export the filtered rows.
pub fn run_headless<W: Write>(args: &Args, mut out: W) -> crate::Result<()> {
    if args.report && args.export.as_deref() == Some(Path::new("-")) {
        bail!("--export - and --report both write to stdout; export to a file instead");
    }
    let spec = args.filter_spec()?;
    let mut source = DataSource::new(&args.data);
    let table = source
        .table()
        .with_context(|| format!("loading {}", args.data.display()))?;

    let segments = SegmentIndex::build(&table);
    let view = apply_filters(&table, &spec, &segments);
    log::info!("{} of {} rows match the filters", view.len(), table.len());

    if let Some(path) = &args.export {
        if path == Path::new("-") {
            write_csv(&view, &mut out).context("writing CSV to stdout")?;
        } else {
            export_csv(&view, path).with_context(|| format!("exporting to {}", path.display()))?;
        }
    }

    if args.report {
        let report = build_report(&view, &spec, &args.report_options());
        serde_json::to_writer_pretty(&mut out, &report).context("writing report")?;
        writeln!(out)?;
    }

    Ok(())
}
