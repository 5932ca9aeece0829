use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::{Datelike, Month, NaiveDate, Weekday};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::data::model::{weekday_name, TableView, Transaction};

// ---------------------------------------------------------------------------
// GroupValue – one group label
// ---------------------------------------------------------------------------

/// A group label. Ordered so that temporal keys sort chronologically, months
/// from January and days of the week from Monday.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupValue {
    Text(String),
    Integer(i64),
    Date(NaiveDate),
    Month(Month),
    Weekday(Weekday),
}

// -- Manual Eq/Ord/Hash: chrono's Weekday has no Ord --

impl Eq for GroupValue {}

impl PartialOrd for GroupValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GroupValue {
    fn cmp(&self, other: &Self) -> Ordering {
        use GroupValue::*;
        fn discriminant(v: &GroupValue) -> u8 {
            match v {
                Integer(_) => 0,
                Date(_) => 1,
                Month(_) => 2,
                Weekday(_) => 3,
                Text(_) => 4,
            }
        }
        match (self, other) {
            (Text(a), Text(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
            (Month(a), Month(b)) => a.number_from_month().cmp(&b.number_from_month()),
            (Weekday(a), Weekday(b)) => a
                .num_days_from_monday()
                .cmp(&b.num_days_from_monday()),
            _ => discriminant(self).cmp(&discriminant(other)),
        }
    }
}

impl std::hash::Hash for GroupValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            GroupValue::Text(s) => s.hash(state),
            GroupValue::Integer(i) => i.hash(state),
            GroupValue::Date(d) => d.hash(state),
            GroupValue::Month(m) => m.number_from_month().hash(state),
            GroupValue::Weekday(w) => w.num_days_from_monday().hash(state),
        }
    }
}

impl fmt::Display for GroupValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupValue::Text(s) => write!(f, "{s}"),
            GroupValue::Integer(i) => write!(f, "{i}"),
            GroupValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            GroupValue::Month(m) => write!(f, "{}", m.name()),
            GroupValue::Weekday(w) => write!(f, "{}", weekday_name(*w)),
        }
    }
}

impl Serialize for GroupValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            GroupValue::Integer(i) => serializer.serialize_i64(*i),
            other => serializer.collect_str(other),
        }
    }
}

impl GroupValue {
    /// Position on a numeric plot axis: the integer itself, days since the
    /// common era for dates, 1-based month, 0-based weekday. `None` for text.
    pub fn as_axis_value(&self) -> Option<f64> {
        match self {
            GroupValue::Integer(i) => Some(*i as f64),
            GroupValue::Date(d) => Some(d.num_days_from_ce() as f64),
            GroupValue::Month(m) => Some(m.number_from_month() as f64),
            GroupValue::Weekday(w) => Some(w.num_days_from_monday() as f64),
            GroupValue::Text(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Request vocabulary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupKey {
    Country,
    Description,
    StockCode,
    CustomerId,
    /// Calendar day of the invoice.
    InvoiceDate,
    YearMonth,
    Year,
    Month,
    DayOfWeek,
    Hour,
}

impl GroupKey {
    /// `None` drops the row from the grouping (lines without a customer when
    /// grouping by customer).
    fn value_of(&self, tx: &Transaction) -> Option<GroupValue> {
        Some(match self {
            GroupKey::Country => GroupValue::Text(tx.country().to_string()),
            GroupKey::Description => GroupValue::Text(tx.description().to_string()),
            GroupKey::StockCode => GroupValue::Text(tx.stock_code().to_string()),
            GroupKey::CustomerId => GroupValue::Text(tx.customer_id()?.to_string()),
            GroupKey::InvoiceDate => GroupValue::Date(tx.date()),
            GroupKey::YearMonth => GroupValue::Text(tx.year_month().to_string()),
            GroupKey::Year => GroupValue::Integer(tx.year() as i64),
            GroupKey::Month => GroupValue::Month(tx.month()),
            GroupKey::DayOfWeek => GroupValue::Weekday(tx.weekday()),
            GroupKey::Hour => GroupValue::Integer(tx.hour() as i64),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NumericColumn {
    TotalPrice,
    Quantity,
    UnitPrice,
}

impl NumericColumn {
    fn value_of(&self, tx: &Transaction) -> f64 {
        match self {
            NumericColumn::TotalPrice => tx.total_price(),
            NumericColumn::Quantity => tx.quantity() as f64,
            NumericColumn::UnitPrice => tx.unit_price(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DistinctColumn {
    Invoice,
    Customer,
    Description,
    StockCode,
    Country,
}

impl DistinctColumn {
    fn value_of<'t>(&self, tx: &'t Transaction) -> Option<&'t str> {
        match self {
            DistinctColumn::Invoice => Some(tx.invoice_no()),
            DistinctColumn::Customer => tx.customer_id(),
            DistinctColumn::Description => Some(tx.description()),
            DistinctColumn::StockCode => Some(tx.stock_code()),
            DistinctColumn::Country => Some(tx.country()),
        }
    }
}

/// The summary computed per group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Measure {
    Sum(NumericColumn),
    /// Number of distinct non-null values.
    CountDistinct(DistinctColumn),
    /// Number of rows.
    Count,
}

/// Group by `key`, summarise with `measure`, optionally keep only the `top_n`
/// largest groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationRequest {
    pub key: GroupKey,
    pub measure: Measure,
    pub top_n: Option<usize>,
}

impl AggregationRequest {
    pub fn new(key: GroupKey, measure: Measure) -> Self {
        Self {
            key,
            measure,
            top_n: None,
        }
    }

    pub fn top(mut self, n: usize) -> Self {
        self.top_n = Some(n);
        self
    }
}

// ---------------------------------------------------------------------------
// Series – ordered group → value mapping
// ---------------------------------------------------------------------------

/// Aggregation output, ready to hand to a chart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    pub points: Vec<(GroupValue, f64)>,
}

impl Series {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(GroupValue, f64)> {
        self.points.iter()
    }

    pub fn get(&self, group: &GroupValue) -> Option<f64> {
        self.points.iter().find(|(g, _)| g == group).map(|(_, v)| *v)
    }

    /// Lookup by display label, handy for text groups.
    pub fn value_for(&self, label: &str) -> Option<f64> {
        self.points
            .iter()
            .find(|(g, _)| g.to_string() == label)
            .map(|(_, v)| *v)
    }

    pub fn total(&self) -> f64 {
        self.points.iter().map(|(_, v)| v).sum()
    }

    /// Keep the first `n` points and fold the rest into one `label` point.
    /// No extra point is added when nothing is left over.
    pub fn with_others(&self, n: usize, label: &str) -> Series {
        let mut points: Vec<_> = self.points.iter().take(n).cloned().collect();
        if self.points.len() > n {
            let rest: f64 = self.points[n..].iter().map(|(_, v)| v).sum();
            points.push((GroupValue::Text(label.to_string()), rest));
        }
        Series { points }
    }
}

impl Serialize for Series {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeSeq;

        struct Point<'p>(&'p GroupValue, f64);
        impl Serialize for Point<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut s = serializer.serialize_struct("Point", 2)?;
                s.serialize_field("group", self.0)?;
                s.serialize_field("value", &self.1)?;
                s.end()
            }
        }

        let mut seq = serializer.serialize_seq(Some(self.points.len()))?;
        for (group, value) in &self.points {
            seq.serialize_element(&Point(group, *value))?;
        }
        seq.end()
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

enum Accumulator<'t> {
    Sum(f64),
    Distinct(HashSet<&'t str>),
    Count(usize),
}

impl<'t> Accumulator<'t> {
    fn new(measure: Measure) -> Self {
        match measure {
            Measure::Sum(_) => Accumulator::Sum(0.0),
            Measure::CountDistinct(_) => Accumulator::Distinct(HashSet::new()),
            Measure::Count => Accumulator::Count(0),
        }
    }

    fn add(&mut self, measure: Measure, tx: &'t Transaction) {
        match (self, measure) {
            (Accumulator::Sum(total), Measure::Sum(col)) => *total += col.value_of(tx),
            (Accumulator::Distinct(seen), Measure::CountDistinct(col)) => {
                if let Some(v) = col.value_of(tx) {
                    seen.insert(v);
                }
            }
            (Accumulator::Count(n), Measure::Count) => *n += 1,
            _ => unreachable!("accumulator built for a different measure"),
        }
    }

    fn finish(self) -> f64 {
        match self {
            Accumulator::Sum(total) => total,
            Accumulator::Distinct(seen) => seen.len() as f64,
            Accumulator::Count(n) => n as f64,
        }
    }
}

/// Group the rows of `view` and summarise each group.
///
/// Without `top_n` the result is ordered by group label. With `top_n` it is
/// ordered by value, largest first, and truncated; equal values keep the
/// order in which their groups were first met in the view. That tie order is
/// an arbitrary but stable policy, not something callers should depend on.
///
/// An empty view yields an empty series.
pub fn aggregate(view: &TableView<'_>, request: &AggregationRequest) -> Series {
    let mut slots: HashMap<GroupValue, usize> = HashMap::new();
    let mut groups: Vec<(GroupValue, Accumulator<'_>)> = Vec::new();

    for tx in view.iter() {
        let Some(group) = request.key.value_of(tx) else {
            continue;
        };
        let slot = match slots.get(&group) {
            Some(&slot) => slot,
            None => {
                slots.insert(group.clone(), groups.len());
                groups.push((group, Accumulator::new(request.measure)));
                groups.len() - 1
            }
        };
        groups[slot].1.add(request.measure, tx);
    }

    let mut points: Vec<(GroupValue, f64)> =
        groups.into_iter().map(|(g, acc)| (g, acc.finish())).collect();

    match request.top_n {
        Some(n) => {
            points.sort_by(|a, b| b.1.total_cmp(&a.1));
            points.truncate(n);
        }
        None => points.sort_by(|a, b| a.0.cmp(&b.0)),
    }

    Series { points }
}
