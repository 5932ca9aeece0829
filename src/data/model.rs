use std::collections::BTreeSet;

use chrono::{Datelike, Month, NaiveDate, NaiveDateTime, Timelike, Weekday};

// ---------------------------------------------------------------------------
// Transaction – one row of the source table
// ---------------------------------------------------------------------------

/// A single invoice line.
///
/// Base fields are private and only readable through accessors; the derived
/// calendar and price fields are computed in [`Transaction::new`], so a
/// record can never carry derived values that disagree with its inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    invoice_no: String,
    stock_code: String,
    description: String,
    /// Negative for returns.
    quantity: i64,
    unit_price: f64,
    customer_id: Option<String>,
    country: String,
    invoice_date: NaiveDateTime,

    // -- derived --
    total_price: f64,
    date: NaiveDate,
    year_month: String,
    month: Month,
    weekday: Weekday,
    hour: u32,
}

impl Transaction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        invoice_no: impl Into<String>,
        stock_code: impl Into<String>,
        description: impl Into<String>,
        quantity: i64,
        unit_price: f64,
        customer_id: Option<String>,
        country: impl Into<String>,
        invoice_date: NaiveDateTime,
    ) -> Self {
        let date = invoice_date.date();
        // month() is always 1..=12
        let month = Month::try_from(date.month() as u8).unwrap_or(Month::January);
        Self {
            invoice_no: invoice_no.into(),
            stock_code: stock_code.into(),
            description: description.into(),
            quantity,
            unit_price,
            customer_id,
            country: country.into(),
            invoice_date,
            total_price: quantity as f64 * unit_price,
            date,
            year_month: invoice_date.format("%Y-%m").to_string(),
            month,
            weekday: date.weekday(),
            hour: invoice_date.hour(),
        }
    }

    pub fn invoice_no(&self) -> &str {
        &self.invoice_no
    }

    pub fn stock_code(&self) -> &str {
        &self.stock_code
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn unit_price(&self) -> f64 {
        self.unit_price
    }

    pub fn customer_id(&self) -> Option<&str> {
        self.customer_id.as_deref()
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn invoice_date(&self) -> NaiveDateTime {
        self.invoice_date
    }

    /// `quantity * unit_price`.
    pub fn total_price(&self) -> f64 {
        self.total_price
    }

    /// Calendar day of the invoice.
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }

    /// `YYYY-MM`.
    pub fn year_month(&self) -> &str {
        &self.year_month
    }

    pub fn month(&self) -> Month {
        self.month
    }

    pub fn weekday(&self) -> Weekday {
        self.weekday
    }

    pub fn weekday_name(&self) -> &'static str {
        weekday_name(self.weekday)
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }
}

/// Full English day name, e.g. `"Monday"`.
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

// ---------------------------------------------------------------------------
// TransactionTable – the complete loaded dataset
// ---------------------------------------------------------------------------

/// Value ranges of the loaded table, used to seed the filter controls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableBounds {
    pub first_invoice: NaiveDateTime,
    pub last_invoice: NaiveDateTime,
    pub min_quantity: i64,
    pub max_quantity: i64,
    pub min_price: f64,
    pub max_price: f64,
}

/// The full parsed dataset with pre-computed column indices.
///
/// Immutable once built; filtering produces [`TableView`]s over it.
#[derive(Debug, Clone, Default)]
pub struct TransactionTable {
    /// All invoice lines in file order.
    pub rows: Vec<Transaction>,
    /// Sorted distinct countries.
    pub countries: BTreeSet<String>,
    /// Sorted distinct product descriptions.
    pub descriptions: BTreeSet<String>,
    /// `None` for an empty table.
    pub bounds: Option<TableBounds>,
}

impl TransactionTable {
    /// Build column indices from the loaded rows.
    pub fn from_rows(rows: Vec<Transaction>) -> Self {
        let mut countries = BTreeSet::new();
        let mut descriptions = BTreeSet::new();
        let mut bounds: Option<TableBounds> = None;

        for tx in &rows {
            countries.insert(tx.country.clone());
            descriptions.insert(tx.description.clone());
            bounds = Some(match bounds {
                None => TableBounds {
                    first_invoice: tx.invoice_date,
                    last_invoice: tx.invoice_date,
                    min_quantity: tx.quantity,
                    max_quantity: tx.quantity,
                    min_price: tx.unit_price,
                    max_price: tx.unit_price,
                },
                Some(b) => TableBounds {
                    first_invoice: b.first_invoice.min(tx.invoice_date),
                    last_invoice: b.last_invoice.max(tx.invoice_date),
                    min_quantity: b.min_quantity.min(tx.quantity),
                    max_quantity: b.max_quantity.max(tx.quantity),
                    min_price: b.min_price.min(tx.unit_price),
                    max_price: b.max_price.max(tx.unit_price),
                },
            });
        }

        TransactionTable {
            rows,
            countries,
            descriptions,
            bounds,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// A view over every row.
    pub fn view(&self) -> TableView<'_> {
        TableView {
            table: self,
            indices: (0..self.rows.len()).collect(),
        }
    }

    /// Product descriptions sold in any of `countries`; all descriptions when
    /// the set is empty.
    pub fn descriptions_in(&self, countries: &BTreeSet<String>) -> BTreeSet<String> {
        if countries.is_empty() {
            return self.descriptions.clone();
        }
        self.rows
            .iter()
            .filter(|tx| countries.contains(&tx.country))
            .map(|tx| tx.description.clone())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// TableView – filtered row selection
// ---------------------------------------------------------------------------

/// A selection of rows from a [`TransactionTable`], kept as ascending row
/// indices. Views never copy or mutate rows.
#[derive(Debug, Clone)]
pub struct TableView<'a> {
    table: &'a TransactionTable,
    indices: Vec<usize>,
}

impl<'a> TableView<'a> {
    /// Build a view from row indices. Indices must be valid for `table`.
    pub fn new(table: &'a TransactionTable, indices: Vec<usize>) -> Self {
        debug_assert!(indices.iter().all(|&i| i < table.rows.len()));
        Self { table, indices }
    }

    pub fn table(&self) -> &'a TransactionTable {
        self.table
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Iterate the selected rows in table order.
    pub fn iter(&self) -> impl Iterator<Item = &'a Transaction> + '_ {
        let rows = &self.table.rows;
        self.indices.iter().map(move |&i| &rows[i])
    }

    /// Narrow the view with a further predicate, producing a new view.
    pub fn retain<F>(&self, mut keep: F) -> TableView<'a>
    where
        F: FnMut(&Transaction) -> bool,
    {
        let indices = self
            .indices
            .iter()
            .copied()
            .filter(|&i| keep(&self.table.rows[i]))
            .collect();
        TableView {
            table: self.table,
            indices,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    pub(crate) fn tx(
        invoice: &str,
        description: &str,
        quantity: i64,
        price: f64,
        customer: Option<&str>,
        country: &str,
        when: &str,
    ) -> Transaction {
        Transaction::new(
            invoice,
            format!("SC-{description}"),
            description,
            quantity,
            price,
            customer.map(str::to_string),
            country,
            ts(when),
        )
    }

    #[test]
    fn derived_columns_follow_inputs() {
        let t = tx("1", "MUG", -3, 2.5, Some("17850"), "France", "2011-01-06 14:05:00");
        assert_eq!(t.total_price(), -7.5);
        assert_eq!(t.year(), 2011);
        assert_eq!(t.year_month(), "2011-01");
        assert_eq!(t.month(), Month::January);
        assert_eq!(t.weekday(), Weekday::Thu);
        assert_eq!(t.hour(), 14);
        assert_eq!(t.date(), NaiveDate::from_ymd_opt(2011, 1, 6).unwrap());
    }

    #[test]
    fn table_indices_and_bounds() {
        let table = TransactionTable::from_rows(vec![
            tx("1", "A", 5, 2.0, Some("1"), "United Kingdom", "2011-01-05 10:00:00"),
            tx("2", "B", -3, 0.5, None, "France", "2011-02-01 09:00:00"),
            tx("3", "C", 12, 4.0, Some("2"), "France", "2010-12-01 08:00:00"),
        ]);

        assert_eq!(table.len(), 3);
        assert_eq!(
            table.countries.iter().collect::<Vec<_>>(),
            vec!["France", "United Kingdom"]
        );
        let b = table.bounds.unwrap();
        assert_eq!(b.first_invoice, ts("2010-12-01 08:00:00"));
        assert_eq!(b.last_invoice, ts("2011-02-01 09:00:00"));
        assert_eq!((b.min_quantity, b.max_quantity), (-3, 12));
        assert_eq!((b.min_price, b.max_price), (0.5, 4.0));

        let fr: BTreeSet<String> = ["France".to_string()].into();
        assert_eq!(
            table.descriptions_in(&fr).into_iter().collect::<Vec<_>>(),
            vec!["B", "C"]
        );
        assert_eq!(table.descriptions_in(&BTreeSet::new()).len(), 3);
    }

    #[test]
    fn empty_table_has_no_bounds() {
        let table = TransactionTable::from_rows(Vec::new());
        assert!(table.is_empty());
        assert!(table.bounds.is_none());
        assert!(table.view().is_empty());
    }

    #[test]
    fn retain_narrows_without_touching_table() {
        let table = TransactionTable::from_rows(vec![
            tx("1", "A", 5, 2.0, Some("1"), "UK", "2011-01-05 10:00:00"),
            tx("2", "B", 7, 1.0, Some("2"), "UK", "2011-01-06 10:00:00"),
        ]);
        let view = table.view();
        let narrowed = view.retain(|t| t.quantity() > 5);
        assert_eq!(narrowed.indices(), &[1]);
        assert_eq!(view.len(), 2);
        assert_eq!(table.len(), 2);
    }
}
