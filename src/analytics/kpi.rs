use std::collections::HashSet;

use serde::Serialize;

use crate::data::model::TableView;

/// Headline numbers shown above the charts. All zero for an empty view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Kpis {
    /// Sum of line totals, returns included.
    pub total_sales: f64,
    /// Distinct invoices.
    pub order_count: usize,
    /// Distinct known customers.
    pub customer_count: usize,
    /// Distinct product descriptions.
    pub product_count: usize,
    /// Invoice lines in the view.
    pub line_count: usize,
}

pub fn compute_kpis(view: &TableView<'_>) -> Kpis {
    let mut invoices = HashSet::new();
    let mut customers = HashSet::new();
    let mut products = HashSet::new();
    let mut total_sales = 0.0;

    for tx in view.iter() {
        total_sales += tx.total_price();
        invoices.insert(tx.invoice_no());
        products.insert(tx.description());
        if let Some(c) = tx.customer_id() {
            customers.insert(c);
        }
    }

    Kpis {
        total_sales,
        order_count: invoices.len(),
        customer_count: customers.len(),
        product_count: products.len(),
        line_count: view.len(),
    }
}
