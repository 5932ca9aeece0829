use std::fmt;

use chrono::Weekday;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::aggregate::{
    aggregate, AggregationRequest, DistinctColumn, GroupKey, GroupValue, Measure, NumericColumn,
    Series,
};
use super::kpi::{compute_kpis, Kpis};
use super::rfm::{compute_rfm, summarize, RfmRow, RfmSummary};
use super::stats::{box_stats, BoxStats};
use crate::data::filter::FilterSpec;
use crate::data::model::TableView;
use crate::data::segment::CustomerSegment;

const SALES: Measure = Measure::Sum(NumericColumn::TotalPrice);

// ---------------------------------------------------------------------------
// Report options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum TrendGranularity {
    #[default]
    Daily,
    Monthly,
    Yearly,
}

impl TrendGranularity {
    pub const ALL: [TrendGranularity; 3] = [Self::Daily, Self::Monthly, Self::Yearly];

    fn group_key(self) -> GroupKey {
        match self {
            TrendGranularity::Daily => GroupKey::InvoiceDate,
            TrendGranularity::Monthly => GroupKey::YearMonth,
            TrendGranularity::Yearly => GroupKey::Year,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TrendGranularity::Daily => "Daily",
            TrendGranularity::Monthly => "Monthly",
            TrendGranularity::Yearly => "Yearly",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum ProductRanking {
    #[default]
    Revenue,
    Quantity,
    /// Number of distinct invoices containing the product.
    Popularity,
}

impl ProductRanking {
    pub const ALL: [ProductRanking; 3] = [Self::Revenue, Self::Quantity, Self::Popularity];

    fn measure(self) -> Measure {
        match self {
            ProductRanking::Revenue => SALES,
            ProductRanking::Quantity => Measure::Sum(NumericColumn::Quantity),
            ProductRanking::Popularity => Measure::CountDistinct(DistinctColumn::Invoice),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ProductRanking::Revenue => "Revenue",
            ProductRanking::Quantity => "Quantity",
            ProductRanking::Popularity => "Popularity",
        }
    }

    /// Axis label for the ranked value.
    pub fn unit(self) -> &'static str {
        match self {
            ProductRanking::Revenue => "Revenue (£)",
            ProductRanking::Quantity => "Quantity Sold",
            ProductRanking::Popularity => "Number of Orders",
        }
    }
}

/// Chart choices and list lengths.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportOptions {
    pub granularity: TrendGranularity,
    pub ranking: ProductRanking,
    pub top_products: usize,
    pub top_countries: usize,
    pub top_customer_countries: usize,
    /// Countries shown before the "Others" slice.
    pub customer_share_slices: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            granularity: TrendGranularity::Daily,
            ranking: ProductRanking::Revenue,
            top_products: 10,
            top_countries: 20,
            top_customer_countries: 10,
            customer_share_slices: 5,
        }
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Marker attached to a report whose filters matched no rows. Every table in
/// such a report is empty and every KPI zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EmptyResultWarning;

impl fmt::Display for EmptyResultWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("No transactions match the current filters")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RfmAnalysis {
    pub rows: Vec<RfmRow>,
    pub summary: Option<RfmSummary>,
}

/// Daily sales for one country.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryTrend {
    pub country: String,
    pub sales: Series,
}

/// Everything the dashboard draws, computed in one pass over a filtered view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardReport {
    pub kpis: Kpis,
    pub warning: Option<EmptyResultWarning>,
    pub options: ReportOptions,
    pub sales_trend: Series,
    pub sales_by_weekday: Series,
    pub sales_by_hour: Series,
    pub top_products: Series,
    pub price_distribution: Option<BoxStats>,
    pub sales_by_country: Series,
    /// Whether the selection spans more than one country.
    pub compares_countries: bool,
    pub customers_by_country: Series,
    pub customer_share: Series,
    pub country_trends: Vec<CountryTrend>,
    /// Not computed for the `New` segment.
    pub rfm: Option<RfmAnalysis>,
}

impl DashboardReport {
    pub fn is_empty(&self) -> bool {
        self.warning.is_some()
    }
}

pub fn build_report(
    view: &TableView<'_>,
    spec: &FilterSpec,
    options: &ReportOptions,
) -> DashboardReport {
    let by = |key: GroupKey, measure: Measure| aggregate(view, &AggregationRequest::new(key, measure));
    let top = |key: GroupKey, measure: Measure, n: usize| {
        aggregate(view, &AggregationRequest::new(key, measure).top(n))
    };

    let warning = if view.is_empty() {
        log::warn!("{}", EmptyResultWarning);
        Some(EmptyResultWarning)
    } else {
        None
    };

    let ranked_customers = top(
        GroupKey::Country,
        Measure::CountDistinct(DistinctColumn::Customer),
        usize::MAX,
    );

    let prices: Vec<f64> = view.iter().map(|tx| tx.unit_price()).collect();

    let rfm = (spec.customer_segment != CustomerSegment::New).then(|| {
        let rows = compute_rfm(view);
        let summary = summarize(&rows);
        RfmAnalysis { rows, summary }
    });

    DashboardReport {
        kpis: compute_kpis(view),
        warning,
        options: *options,
        sales_trend: by(options.granularity.group_key(), SALES),
        sales_by_weekday: full_week(by(GroupKey::DayOfWeek, SALES)),
        sales_by_hour: by(GroupKey::Hour, SALES),
        top_products: top(GroupKey::Description, options.ranking.measure(), options.top_products),
        price_distribution: box_stats(&prices),
        sales_by_country: top(GroupKey::Country, SALES, options.top_countries),
        compares_countries: spec.compares_countries(),
        customers_by_country: Series {
            points: ranked_customers
                .points
                .iter()
                .take(options.top_customer_countries)
                .cloned()
                .collect(),
        },
        customer_share: ranked_customers.with_others(options.customer_share_slices, "Others"),
        country_trends: country_trends(view),
        rfm,
    }
}

/// Monday..Sunday with 0.0 for days without sales. An empty series stays empty.
fn full_week(series: Series) -> Series {
    if series.is_empty() {
        return series;
    }
    let points = WEEK
        .into_iter()
        .map(|day| {
            let group = GroupValue::Weekday(day);
            let value = series.get(&group).unwrap_or(0.0);
            (group, value)
        })
        .collect();
    Series { points }
}

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// One daily sales series per country present in the view, by country name.
fn country_trends(view: &TableView<'_>) -> Vec<CountryTrend> {
    let countries = aggregate(view, &AggregationRequest::new(GroupKey::Country, Measure::Count));
    countries
        .iter()
        .filter_map(|(group, _)| match group {
            GroupValue::Text(country) => Some(country.clone()),
            _ => None,
        })
        .map(|country| {
            let rows = view.retain(|tx| tx.country() == country);
            let sales = aggregate(&rows, &AggregationRequest::new(GroupKey::InvoiceDate, SALES));
            CountryTrend { country, sales }
        })
        .collect()
}
