use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::model::{TableView, Transaction, TransactionTable};
use super::segment::{CustomerSegment, SegmentIndex};

/// Country the dashboards start out showing when the data contains it.
pub const DEFAULT_COUNTRY: &str = "United Kingdom";

// ---------------------------------------------------------------------------
// Filter predicate: which rows the dashboard should consider
// ---------------------------------------------------------------------------

/// A conjunction of optional predicates. `None` ranges and empty sets mean
/// "no restriction" (an empty country set shows every country, it never hides
/// everything).
///
/// Ranges are closed on both ends. A reversed range (`min > max`) matches
/// nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    /// Calendar days, the end day included in full.
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub countries: BTreeSet<String>,
    pub products: BTreeSet<String>,
    pub customer_segment: CustomerSegment,
    pub quantity_range: Option<(i64, i64)>,
    pub price_range: Option<(f64, f64)>,
    /// Substring of the customer id; empty means any.
    pub customer_search: String,
}

impl FilterSpec {
    /// Initial selection for a freshly loaded table: ranges spanning the whole
    /// table and the default country if present.
    pub fn for_table(table: &TransactionTable) -> Self {
        let mut spec = FilterSpec::default();
        if let Some(b) = table.bounds {
            spec.date_range = Some((b.first_invoice.date(), b.last_invoice.date()));
            spec.quantity_range = Some((b.min_quantity, b.max_quantity));
            spec.price_range = Some((b.min_price, b.max_price));
        }
        if table.countries.contains(DEFAULT_COUNTRY) {
            spec.countries.insert(DEFAULT_COUNTRY.to_string());
        }
        spec
    }

    /// Whether a by-country comparison is meaningful for this selection.
    pub fn compares_countries(&self) -> bool {
        self.countries.len() != 1
    }

    /// Every predicate except the customer segment.
    pub fn matches_row(&self, tx: &Transaction) -> bool {
        if let Some((start, end)) = self.date_range {
            let day = tx.date();
            if day < start || day > end {
                return false;
            }
        }
        if let Some((min, max)) = self.quantity_range {
            if tx.quantity() < min || tx.quantity() > max {
                return false;
            }
        }
        if let Some((min, max)) = self.price_range {
            if tx.unit_price() < min || tx.unit_price() > max {
                return false;
            }
        }
        if !self.countries.is_empty() && !self.countries.contains(tx.country()) {
            return false;
        }
        if !self.products.is_empty() && !self.products.contains(tx.description()) {
            return false;
        }
        if !self.customer_search.is_empty() {
            match tx.customer_id() {
                Some(id) if id.contains(self.customer_search.as_str()) => {}
                _ => return false,
            }
        }
        true
    }
}

/// Return the view of rows that pass all active filters.
///
/// The segment predicate runs last, against classifications taken from the
/// full table in `segments`.
pub fn apply_filters<'a>(
    table: &'a TransactionTable,
    spec: &FilterSpec,
    segments: &SegmentIndex,
) -> TableView<'a> {
    let indices = table
        .rows
        .iter()
        .enumerate()
        .filter(|(_, tx)| spec.matches_row(tx))
        .filter(|(_, tx)| segments.matches(spec.customer_segment, tx))
        .map(|(i, _)| i)
        .collect();
    TableView::new(table, indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::tx;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn sample() -> TransactionTable {
        TransactionTable::from_rows(vec![
            tx("1", "A", 5, 2.0, Some("17850"), "UK", "2011-01-05 10:00:00"),
            tx("2", "B", -3, 2.0, Some("13047"), "FR", "2011-01-06 11:00:00"),
            tx("3", "A", 12, 0.5, Some("17850"), "UK", "2011-01-07 23:30:00"),
            tx("4", "C", 1, 8.0, None, "uk", "2011-01-08 08:00:00"),
        ])
    }

    fn run(table: &TransactionTable, spec: &FilterSpec) -> Vec<usize> {
        let segments = SegmentIndex::build(table);
        apply_filters(table, spec, &segments).indices().to_vec()
    }

    #[test]
    fn country_and_quantity_filter() {
        let table = TransactionTable::from_rows(vec![
            tx("1", "A", 5, 2.0, Some("1"), "UK", "2011-01-05 00:00:00"),
            tx("2", "A", -3, 2.0, Some("2"), "FR", "2011-01-06 00:00:00"),
        ]);
        let spec = FilterSpec {
            countries: set(&["UK"]),
            quantity_range: Some((0, 100)),
            ..Default::default()
        };
        assert_eq!(run(&table, &spec), vec![0]);
    }

    #[test]
    fn empty_sets_do_not_restrict() {
        let table = sample();
        assert_eq!(run(&table, &FilterSpec::default()), vec![0, 1, 2, 3]);
    }

    #[test]
    fn membership_is_case_sensitive() {
        let table = sample();
        let spec = FilterSpec {
            countries: set(&["UK"]),
            ..Default::default()
        };
        assert_eq!(run(&table, &spec), vec![0, 2]);
    }

    #[test]
    fn date_range_includes_whole_end_day() {
        let table = sample();
        let spec = FilterSpec {
            date_range: Some((d("2011-01-06"), d("2011-01-07"))),
            ..Default::default()
        };
        assert_eq!(run(&table, &spec), vec![1, 2]);
    }

    #[test]
    fn reversed_ranges_are_empty_not_errors() {
        let table = sample();
        for spec in [
            FilterSpec {
                date_range: Some((d("2011-01-08"), d("2011-01-05"))),
                ..Default::default()
            },
            FilterSpec {
                quantity_range: Some((10, 1)),
                ..Default::default()
            },
            FilterSpec {
                price_range: Some((5.0, 1.0)),
                ..Default::default()
            },
        ] {
            assert!(run(&table, &spec).is_empty());
        }
    }

    #[test]
    fn price_bounds_are_inclusive() {
        let table = sample();
        let spec = FilterSpec {
            price_range: Some((0.5, 2.0)),
            ..Default::default()
        };
        assert_eq!(run(&table, &spec), vec![0, 1, 2]);
    }

    #[test]
    fn customer_search_is_substring_and_skips_anonymous() {
        let table = sample();
        let spec = FilterSpec {
            customer_search: "785".into(),
            ..Default::default()
        };
        assert_eq!(run(&table, &spec), vec![0, 2]);
    }

    #[test]
    fn segment_applies_after_other_predicates() {
        let table = sample();
        let spec = FilterSpec {
            customer_segment: CustomerSegment::Repeat,
            countries: set(&["UK", "FR"]),
            ..Default::default()
        };
        // 17850 has invoices 1 and 3 in the full table
        assert_eq!(run(&table, &spec), vec![0, 2]);

        // still repeat when the filter hides one of the invoices
        let narrowed = FilterSpec {
            date_range: Some((d("2011-01-05"), d("2011-01-05"))),
            ..spec
        };
        assert_eq!(run(&table, &narrowed), vec![0]);
    }

    #[test]
    fn initial_spec_covers_table() {
        let table = TransactionTable::from_rows(vec![
            tx("1", "A", 5, 2.0, Some("1"), "United Kingdom", "2011-01-05 10:00:00"),
            tx("2", "B", -3, 4.0, Some("2"), "France", "2011-02-06 00:00:00"),
        ]);
        let spec = FilterSpec::for_table(&table);
        assert_eq!(spec.date_range, Some((d("2011-01-05"), d("2011-02-06"))));
        assert_eq!(spec.quantity_range, Some((-3, 5)));
        assert_eq!(spec.price_range, Some((2.0, 4.0)));
        assert_eq!(spec.countries, set(&["United Kingdom"]));
        assert!(!spec.compares_countries());

        let no_uk = TransactionTable::from_rows(vec![tx(
            "1", "A", 1, 1.0, None, "France", "2011-01-05 10:00:00",
        )]);
        assert!(FilterSpec::for_table(&no_uk).countries.is_empty());
    }

    #[test]
    fn deserializes_partial_json() {
        let spec: FilterSpec = serde_json::from_str(
            r#"{"countries": ["France"], "customer_segment": "High Value",
                "date_range": ["2011-01-01", "2011-03-31"]}"#,
        )
        .unwrap();
        assert_eq!(spec.countries, set(&["France"]));
        assert_eq!(spec.customer_segment, CustomerSegment::HighValue);
        assert_eq!(spec.date_range, Some((d("2011-01-01"), d("2011-03-31"))));
        assert!(spec.quantity_range.is_none());
    }
}
