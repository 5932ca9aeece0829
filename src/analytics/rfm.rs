use std::collections::{BTreeMap, HashSet};

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

use super::stats::{describe, Summary};
use crate::data::model::TableView;

/// Recency / frequency / monetary value of one customer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RfmRow {
    pub customer_id: String,
    /// Whole days from the customer's latest invoice to the reference instant.
    pub recency_days: i64,
    /// Distinct invoices.
    pub frequency: usize,
    /// Sum of line totals.
    pub monetary: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RfmSummary {
    pub recency: Summary,
    pub frequency: Summary,
    pub monetary: Summary,
}

/// One day after the latest invoice in the view.
pub fn reference_instant(view: &TableView<'_>) -> Option<NaiveDateTime> {
    view.iter()
        .map(|tx| tx.invoice_date())
        .max()
        .map(|latest| latest + Duration::days(1))
}

/// Per-customer RFM over the rows of `view`, ordered by customer id. Lines
/// without a customer are ignored; an empty view gives no rows.
pub fn compute_rfm(view: &TableView<'_>) -> Vec<RfmRow> {
    let Some(reference) = reference_instant(view) else {
        return Vec::new();
    };

    struct Acc<'t> {
        latest: NaiveDateTime,
        invoices: HashSet<&'t str>,
        monetary: f64,
    }

    let mut per_customer: BTreeMap<&str, Acc<'_>> = BTreeMap::new();
    for tx in view.iter() {
        let Some(customer) = tx.customer_id() else {
            continue;
        };
        let acc = per_customer.entry(customer).or_insert_with(|| Acc {
            latest: tx.invoice_date(),
            invoices: HashSet::new(),
            monetary: 0.0,
        });
        acc.latest = acc.latest.max(tx.invoice_date());
        acc.invoices.insert(tx.invoice_no());
        acc.monetary += tx.total_price();
    }

    per_customer
        .into_iter()
        .map(|(customer, acc)| RfmRow {
            customer_id: customer.to_string(),
            recency_days: (reference - acc.latest).num_days(),
            frequency: acc.invoices.len(),
            monetary: acc.monetary,
        })
        .collect()
}

/// Column summaries of the RFM table; `None` when it is empty.
pub fn summarize(rows: &[RfmRow]) -> Option<RfmSummary> {
    let recency: Vec<f64> = rows.iter().map(|r| r.recency_days as f64).collect();
    let frequency: Vec<f64> = rows.iter().map(|r| r.frequency as f64).collect();
    let monetary: Vec<f64> = rows.iter().map(|r| r.monetary).collect();
    Some(RfmSummary {
        recency: describe(&recency)?,
        frequency: describe(&frequency)?,
        monetary: describe(&monetary)?,
    })
}
