//! Integration tests for retail-dash

use std::collections::BTreeSet;
use std::io::Write;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::Parser;
use tempfile::{Builder, NamedTempFile};

use retail_dash::analytics::aggregate::{aggregate, AggregationRequest, GroupKey, Measure, NumericColumn};
use retail_dash::analytics::kpi::{compute_kpis, Kpis};
use retail_dash::analytics::rfm::compute_rfm;
use retail_dash::cli::{run_headless, Args};
use retail_dash::data::loader::load_file;
use retail_dash::{
    apply_filters, build_report, CustomerSegment, DataSource, FilterSpec, ReportOptions,
    SegmentIndex, TransactionTable,
};

const HEADER: &str = "InvoiceNo,StockCode,Description,Quantity,InvoiceDate,UnitPrice,CustomerID,Country";

fn csv_file(lines: &[&str]) -> NamedTempFile {
    let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
    writeln!(file, "{HEADER}").unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
    file.flush().unwrap();
    file
}

/// Create a test CSV file with sample data
fn create_test_csv() -> NamedTempFile {
    csv_file(&[
        // Customer 17850 - two invoices
        "536365,85123A,WHITE HANGING HEART T-LIGHT HOLDER,6,2010-12-01 08:26:00,2.55,17850.0,United Kingdom",
        "536365,71053,WHITE METAL LANTERN,6,2010-12-01 08:26:00,3.39,17850.0,United Kingdom",
        "536366,22633,HAND WARMER UNION JACK,6,2011-11-01 08:28:00,1.85,17850.0,United Kingdom",
        // Customer 13047 - single purchase
        "536367,84406B,CREAM CUPID HEARTS COAT HANGER,8,2010-12-01 08:34:00,2.75,13047.0,United Kingdom",
        // Customer 12345 - recent, abroad
        "536368,22752,SET 7 BABUSHKA NESTING BOXES,2,2011-12-05 10:15:00,7.65,12345.0,France",
        "536368,21730,GLASS STAR FROSTED T-LIGHT HOLDER,12,2011-12-05 10:15:00,1.25,12345.0,France",
        // Customer 98765 - only a return
        "C536369,22457,NATURAL SLATE HEART CHALKBOARD,-4,2011-01-15 09:00:00,3.25,98765.0,Germany",
        // Anonymous
        "536370,22457,NATURAL SLATE HEART CHALKBOARD,4,2011-02-15 09:00:00,3.25,,United Kingdom",
    ])
}

fn load(file: &NamedTempFile) -> TransactionTable {
    load_file(file.path()).unwrap()
}

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn assert_close(a: f64, b: f64) {
    assert!((a - b).abs() < 1e-9, "{a} != {b}");
}

#[test]
fn test_end_to_end_pipeline() {
    let file = create_test_csv();
    let table = load(&file);
    assert_eq!(table.len(), 8);
    assert_eq!(table.countries.len(), 3);

    let segments = SegmentIndex::build(&table);
    let spec = FilterSpec::for_table(&table);
    let view = apply_filters(&table, &spec, &segments);
    assert_eq!(view.len(), 5);

    let report = build_report(&view, &spec, &ReportOptions::default());
    assert!(report.warning.is_none());
    assert_close(report.kpis.total_sales, 15.3 + 20.34 + 11.1 + 22.0 + 13.0);
    assert_eq!(report.kpis.order_count, 4);
    assert_eq!(report.kpis.customer_count, 2);
    assert_eq!(report.kpis.product_count, 5);
    assert!(!report.compares_countries);
    assert_eq!(report.top_products.len(), 5);
    assert_eq!(
        report.top_products.points[0].0.to_string(),
        "CREAM CUPID HEARTS COAT HANGER"
    );
    assert!(report.rfm.is_some());
}

#[test]
fn test_uk_quantity_filter_example() {
    let file = csv_file(&[
        "1,A,MUG,5,2011-01-05 10:00:00,2.00,17850,UK",
        "2,B,MUG,-3,2011-01-06 10:00:00,2.00,13047,FR",
    ]);
    let table = load(&file);
    let segments = SegmentIndex::build(&table);
    let spec = FilterSpec {
        countries: BTreeSet::from(["UK".to_string()]),
        quantity_range: Some((0, 100)),
        ..Default::default()
    };

    let view = apply_filters(&table, &spec, &segments);
    assert_eq!(view.len(), 1);
    let kpis = compute_kpis(&view);
    assert_close(kpis.total_sales, 10.0);
    assert_eq!(kpis.order_count, 1);
}

#[test]
fn test_top_product_by_quantity_example() {
    let file = csv_file(&[
        "1,SA,A,10,2011-01-05 10:00:00,1.00,1,UK",
        "2,SB,B,20,2011-01-06 10:00:00,1.00,2,UK",
    ]);
    let table = load(&file);
    let request =
        AggregationRequest::new(GroupKey::Description, Measure::Sum(NumericColumn::Quantity)).top(1);
    let series = aggregate(&table.view(), &request);
    assert_eq!(series.len(), 1);
    assert_eq!(series.value_for("B"), Some(20.0));
}

#[test]
fn test_reversed_date_range_is_empty_not_an_error() {
    let file = create_test_csv();
    let table = load(&file);
    let segments = SegmentIndex::build(&table);
    let spec = FilterSpec {
        date_range: Some((d("2011-12-31"), d("2010-01-01"))),
        ..Default::default()
    };

    let view = apply_filters(&table, &spec, &segments);
    assert!(view.is_empty());

    let report = build_report(&view, &spec, &ReportOptions::default());
    assert!(report.warning.is_some());
    assert_eq!(report.kpis, Kpis::default());
    assert!(report.sales_trend.is_empty());
    assert!(report.top_products.is_empty());
    assert!(report.customer_share.is_empty());
    assert!(report.price_distribution.is_none());
    assert!(report.country_trends.is_empty());
    assert!(report.rfm.as_ref().unwrap().rows.is_empty());
}

#[test]
fn test_filtered_view_is_subset_and_monotone() {
    let file = create_test_csv();
    let table = load(&file);
    let segments = SegmentIndex::build(&table);

    let wide = FilterSpec {
        countries: BTreeSet::from(["United Kingdom".to_string(), "France".to_string()]),
        quantity_range: Some((-10, 20)),
        ..Default::default()
    };
    let narrower_qty = FilterSpec {
        quantity_range: Some((0, 6)),
        ..wide.clone()
    };
    let narrower_countries = FilterSpec {
        countries: BTreeSet::from(["France".to_string()]),
        ..wide.clone()
    };

    let base = apply_filters(&table, &wide, &segments);
    // Indices are unique, in table order and in bounds.
    assert!(base.indices().windows(2).all(|w| w[0] < w[1]));
    assert!(base.indices().iter().all(|&i| i < table.len()));

    let a = apply_filters(&table, &narrower_qty, &segments);
    let b = apply_filters(&table, &narrower_countries, &segments);
    assert!(a.len() <= base.len());
    assert!(b.len() <= base.len());
    assert!(a.indices().iter().all(|i| base.indices().contains(i)));
    assert!(b.indices().iter().all(|i| base.indices().contains(i)));
}

#[test]
fn test_new_segment_uses_full_history() {
    let file = create_test_csv();
    let table = load(&file);
    let segments = SegmentIndex::build(&table);
    let spec = FilterSpec {
        date_range: Some((d("2011-01-01"), d("2011-12-31"))),
        customer_segment: CustomerSegment::New,
        ..Default::default()
    };

    let view = apply_filters(&table, &spec, &segments);
    // 17850's November invoice is not their first purchase.
    let invoices: BTreeSet<&str> = view.iter().map(|tx| tx.invoice_no()).collect();
    assert_eq!(invoices, BTreeSet::from(["536368", "C536369"]));

    // 17850 stays a repeat customer even though the view holds one of their invoices.
    let repeat = FilterSpec {
        customer_segment: CustomerSegment::Repeat,
        ..spec.clone()
    };
    let view = apply_filters(&table, &repeat, &segments);
    assert_eq!(view.len(), 1);
    assert_eq!(view.iter().next().unwrap().invoice_no(), "536366");
    assert!(segments.is_repeat("17850.0"));
    assert!(!segments.is_repeat("13047.0"));
}

#[test]
fn test_high_value_selects_at_most_one_hundred() {
    let file = create_test_csv();
    let table = load(&file);
    let segments = SegmentIndex::build(&table);
    assert_eq!(segments.customer_count(), 4);
    assert_eq!(segments.segment_size(CustomerSegment::HighValue), 4);

    let lines: Vec<String> = (0..150)
        .map(|i| format!("{i},S{i},ITEM {i},1,2011-03-01 10:00:00,{}.0,{},UK", i + 1, 20_000 + i))
        .collect();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let file = csv_file(&refs);
    let table = load(&file);
    let segments = SegmentIndex::build(&table);
    assert_eq!(segments.customer_count(), 150);
    assert_eq!(segments.segment_size(CustomerSegment::HighValue), 100);
    // Biggest spender is customer 20149, smallest 20000.
    assert!(segments.is_high_value("20149"));
    assert!(!segments.is_high_value("20000"));
}

#[test]
fn test_rfm_recency_of_latest_customer_is_one() {
    let file = create_test_csv();
    let table = load(&file);
    let rows = compute_rfm(&table.view());
    assert_eq!(rows.len(), 4);

    let latest = rows.iter().find(|r| r.customer_id == "12345.0").unwrap();
    assert_eq!(latest.recency_days, 1);
    assert_eq!(rows.iter().map(|r| r.recency_days).min(), Some(1));

    let repeat = rows.iter().find(|r| r.customer_id == "17850.0").unwrap();
    assert_eq!(repeat.frequency, 2);
    assert_close(repeat.monetary, 15.3 + 20.34 + 11.1);
}

#[test]
fn test_data_source_reuses_loaded_table() {
    let file = create_test_csv();
    let mut source = DataSource::new(file.path());
    let first = source.table().unwrap();
    let second = source.table().unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    source.invalidate();
    let third = source.table().unwrap();
    assert!(!Arc::ptr_eq(&first, &third));
    assert_eq!(third.len(), first.len());
}

#[test]
fn test_headless_report_and_export() {
    let data = create_test_csv();
    let mut filters = Builder::new().suffix(".json").tempfile().unwrap();
    writeln!(filters, r#"{{"countries": ["France"], "customer_segment": "High Value"}}"#).unwrap();
    filters.flush().unwrap();
    let export = Builder::new().suffix(".csv").tempfile().unwrap();

    let args = Args::parse_from([
        "retail-dash",
        "--data",
        data.path().to_str().unwrap(),
        "--filters",
        filters.path().to_str().unwrap(),
        "--export",
        export.path().to_str().unwrap(),
        "--report",
        "--granularity",
        "monthly",
    ]);

    let mut out = Vec::new();
    run_headless(&args, &mut out).unwrap();

    let report: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(report["kpis"]["order_count"], 1);
    assert_eq!(report["kpis"]["customer_count"], 1);
    assert_eq!(report["sales_trend"][0]["group"], "2011-12");

    let exported = load_file(export.path()).unwrap();
    assert_eq!(exported.len(), 2);
    assert!(exported.rows.iter().all(|tx| tx.country() == "France"));
}

#[test]
fn test_headless_export_to_stdout() {
    let data = create_test_csv();
    let args = Args::parse_from([
        "retail-dash",
        "--data",
        data.path().to_str().unwrap(),
        "--export",
        "-",
    ]);

    let mut out = Vec::new();
    run_headless(&args, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert_eq!(text.lines().count(), 9);
    assert!(text.starts_with(HEADER));
}

#[test]
fn test_missing_file_fails_headless_run() {
    let args = Args::parse_from(["retail-dash", "--data", "/no/such/file.csv", "--report"]);
    assert!(run_headless(&args, Vec::new()).is_err());
}
