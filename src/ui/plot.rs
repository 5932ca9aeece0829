use std::ops::RangeInclusive;

use chrono::NaiveDate;
use eframe::egui::{self, Color32, RichText, Ui};
use egui_plot::{
    Bar, BarChart, BoxElem, BoxPlot, BoxSpread, GridMark, Legend, Line, Plot, PlotPoints, Points,
};

use retail_dash::analytics::aggregate::Series;
use retail_dash::analytics::kpi::Kpis;
use retail_dash::analytics::report::{
    DashboardReport, ProductRanking, RfmAnalysis, TrendGranularity,
};
use retail_dash::analytics::stats::{BoxStats, Summary};

use crate::color::{ramp, ColorMap, ACCENT};
use crate::state::{AppState, Tab};

const CHART_HEIGHT: f32 = 280.0;

// ---------------------------------------------------------------------------
// Central panel
// ---------------------------------------------------------------------------

/// Render KPI cards, the tab strip and the active tab's charts.
pub fn dashboard(ui: &mut Ui, state: &mut AppState) {
    let Some(report) = &state.report else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a file to view the dashboard  (File → Open…)");
        });
        return;
    };

    ui.heading("🛍️ Retail Analytics Dashboard");
    kpi_cards(ui, &report.kpis);
    if let Some(warning) = report.warning {
        ui.label(RichText::new(format!("ℹ {warning}")).color(Color32::YELLOW));
    }
    ui.separator();

    // Controls first: they may rebuild the report.
    let mut options_changed = false;
    ui.horizontal(|ui: &mut Ui| {
        for tab in Tab::ALL {
            ui.selectable_value(&mut state.tab, tab, tab.label());
        }
    });
    ui.horizontal(|ui: &mut Ui| match state.tab {
        Tab::Trends => {
            ui.label("Time granularity:");
            for g in TrendGranularity::ALL {
                options_changed |= ui
                    .radio_value(&mut state.options.granularity, g, g.label())
                    .changed();
            }
        }
        Tab::Products => {
            ui.label("Rank products by:");
            for r in ProductRanking::ALL {
                options_changed |= ui
                    .radio_value(&mut state.options.ranking, r, r.label())
                    .changed();
            }
        }
        Tab::Geography | Tab::Customers => {}
    });
    if options_changed {
        state.refilter();
    }

    let Some(report) = &state.report else {
        return;
    };
    let color_map = &state.color_map;

    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| match state.tab {
            Tab::Trends => trends_tab(ui, report),
            Tab::Products => products_tab(ui, report),
            Tab::Geography => geography_tab(ui, report, color_map),
            Tab::Customers => customers_tab(ui, report, color_map),
        });
}

fn kpi_cards(ui: &mut Ui, kpis: &Kpis) {
    ui.columns(4, |cols: &mut [Ui]| {
        kpi_card(&mut cols[0], "Total Sales", format!("£{}", thousands(kpis.total_sales, 2)));
        kpi_card(&mut cols[1], "Total Orders", thousands(kpis.order_count as f64, 0));
        kpi_card(&mut cols[2], "Total Customers", thousands(kpis.customer_count as f64, 0));
        kpi_card(&mut cols[3], "Products Sold", thousands(kpis.product_count as f64, 0));
    });
}

fn kpi_card(ui: &mut Ui, title: &str, value: String) {
    egui::Frame::group(ui.style()).show(ui, |ui: &mut Ui| {
        ui.vertical_centered(|ui: &mut Ui| {
            ui.label(title);
            ui.label(RichText::new(value).size(22.0).strong().color(ACCENT));
        });
    });
}

/// Format with comma thousands separators, e.g. `1234567.891 -> "1,234,567.89"`.
pub fn thousands(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && formatted.chars().any(|c| c.is_ascii_digit() && c != '0') {
        "-"
    } else {
        ""
    };
    match frac_part {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

// ---------------------------------------------------------------------------
// Tabs
// ---------------------------------------------------------------------------

fn trends_tab(ui: &mut Ui, report: &DashboardReport) {
    let title = format!("{} Sales Trend", report.options.granularity.label());
    ui.strong(title);
    category_line(ui, "sales_trend", &report.sales_trend, "Sales (£)");

    ui.columns(2, |cols: &mut [Ui]| {
        cols[0].strong("Sales by Day of Week");
        category_bars(
            &mut cols[0],
            "sales_by_weekday",
            &report.sales_by_weekday,
            "Sales (£)",
            false,
            |_| ACCENT,
        );
        cols[1].strong("Sales by Hour of Day");
        hour_line(&mut cols[1], &report.sales_by_hour);
    });
}

fn products_tab(ui: &mut Ui, report: &DashboardReport) {
    let ranking = report.options.ranking;
    ui.strong(format!(
        "Top {} Products by {}",
        report.options.top_products,
        ranking.label()
    ));
    category_bars(ui, "top_products", &report.top_products, ranking.unit(), true, |_| ACCENT);

    ui.add_space(8.0);
    ui.strong("Price Distribution");
    match &report.price_distribution {
        Some(stats) => price_box(ui, stats),
        None => {
            ui.weak("No prices to show.");
        }
    }
}

fn geography_tab(ui: &mut Ui, report: &DashboardReport, color_map: &ColorMap) {
    if report.compares_countries {
        ui.strong(format!("Top {} Countries by Sales", report.options.top_countries));
        category_bars(
            ui,
            "sales_by_country",
            &report.sales_by_country,
            "Sales (£)",
            true,
            |label| color_map.color_for(label),
        );
    } else {
        ui.label("ℹ Select multiple countries to see the country comparison.");
    }

    ui.add_space(8.0);
    ui.strong("Sales Over Time by Country");
    Plot::new("country_trends")
        .height(CHART_HEIGHT)
        .legend(Legend::default())
        .y_axis_label("Sales (£)")
        .x_axis_formatter(|mark: GridMark, _range: &RangeInclusive<f64>| day_label(mark.value))
        .show(ui, |plot_ui| {
            for trend in &report.country_trends {
                let points: PlotPoints = trend
                    .sales
                    .iter()
                    .filter_map(|(group, value)| Some([group.as_axis_value()?, *value]))
                    .collect();
                plot_ui.line(
                    Line::new(points)
                        .name(&trend.country)
                        .color(color_map.color_for(&trend.country)),
                );
            }
        });
}

fn customers_tab(ui: &mut Ui, report: &DashboardReport, color_map: &ColorMap) {
    ui.columns(2, |cols: &mut [Ui]| {
        cols[0].strong("Customer Distribution by Country");
        category_bars(
            &mut cols[0],
            "customers_by_country",
            &report.customers_by_country,
            "Customers",
            true,
            |label| color_map.color_for(label),
        );
        cols[1].strong("Customer Share by Country");
        share_bars(&mut cols[1], &report.customer_share, color_map);
    });

    ui.add_space(8.0);
    ui.strong("RFM Analysis");
    match &report.rfm {
        Some(rfm) => rfm_section(ui, rfm),
        None => {
            ui.label("ℹ RFM analysis is not available for new customers only.");
        }
    }
}

// ---------------------------------------------------------------------------
// Chart helpers
// ---------------------------------------------------------------------------

fn labels(series: &Series) -> Vec<String> {
    series.iter().map(|(group, _)| group.to_string()).collect()
}

/// Axis formatter that names integer ticks after the category at that index.
fn index_formatter(labels: Vec<String>) -> impl Fn(GridMark, &RangeInclusive<f64>) -> String {
    move |mark: GridMark, _range: &RangeInclusive<f64>| {
        let v = mark.value;
        if v < 0.0 || v.fract() != 0.0 {
            return String::new();
        }
        labels.get(v as usize).cloned().unwrap_or_default()
    }
}

fn day_label(value: f64) -> String {
    if value.fract() != 0.0 {
        return String::new();
    }
    NaiveDate::from_num_days_from_ce_opt(value as i32)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Line over categories placed at 0, 1, 2, … with the category names on the x axis.
fn category_line(ui: &mut Ui, id: &str, series: &Series, y_label: &str) {
    let points: PlotPoints = series
        .iter()
        .enumerate()
        .map(|(i, (_, value))| [i as f64, *value])
        .collect();

    Plot::new(id)
        .height(CHART_HEIGHT)
        .y_axis_label(y_label)
        .x_axis_formatter(index_formatter(labels(series)))
        .show(ui, |plot_ui| {
            plot_ui.line(Line::new(points).color(ACCENT).width(2.0));
        });
}

/// Bar chart over categories. Horizontal charts put the first category on top.
fn category_bars(
    ui: &mut Ui,
    id: &str,
    series: &Series,
    value_label: &str,
    horizontal: bool,
    color_of: impl Fn(&str) -> Color32,
) {
    let n = series.len();
    let mut names = labels(series);
    let bars: Vec<Bar> = series
        .iter()
        .enumerate()
        .map(|(i, (group, value))| {
            let label = group.to_string();
            let position = if horizontal { (n - 1 - i) as f64 } else { i as f64 };
            Bar::new(position, *value)
                .name(format!("{label}: {}", thousands(*value, 2)))
                .fill(color_of(&label))
                .width(0.7)
        })
        .collect();
    if horizontal {
        names.reverse();
    }

    let mut chart = BarChart::new(bars);
    let mut plot = Plot::new(id).height(CHART_HEIGHT).allow_drag(false);
    if horizontal {
        chart = chart.horizontal();
        plot = plot
            .x_axis_label(value_label)
            .y_axis_formatter(index_formatter(names));
    } else {
        plot = plot
            .y_axis_label(value_label)
            .x_axis_formatter(index_formatter(names));
    }
    plot.show(ui, |plot_ui| plot_ui.bar_chart(chart));
}

fn hour_line(ui: &mut Ui, series: &Series) {
    let coords: Vec<[f64; 2]> = series
        .iter()
        .filter_map(|(group, value)| Some([group.as_axis_value()?, *value]))
        .collect();

    Plot::new("sales_by_hour")
        .height(CHART_HEIGHT)
        .x_axis_label("Hour")
        .y_axis_label("Sales (£)")
        .show(ui, |plot_ui| {
            plot_ui.line(Line::new(PlotPoints::from(coords.clone())).color(ACCENT));
            plot_ui.points(Points::new(PlotPoints::from(coords)).radius(3.0).color(ACCENT));
        });
}

fn price_box(ui: &mut Ui, stats: &BoxStats) {
    let spread = BoxSpread::new(
        stats.lower_whisker,
        stats.q1,
        stats.median,
        stats.q3,
        stats.upper_whisker,
    );
    let elem = BoxElem::new(0.0, spread)
        .name("Unit Price (£)")
        .fill(ACCENT.linear_multiply(0.3))
        .stroke(egui::Stroke::new(1.5, ACCENT));

    Plot::new("price_distribution")
        .height(140.0)
        .x_axis_label("Unit Price (£)")
        .show_y(false)
        .show(ui, |plot_ui| {
            plot_ui.box_plot(BoxPlot::new(vec![elem]).horizontal());
        });
    ui.weak(format!(
        "min £{:.2} · median £{:.2} · max £{:.2} · {} outliers",
        stats.min, stats.median, stats.max, stats.outliers
    ));
}

/// Percent-of-total bars, one per slice including "Others".
fn share_bars(ui: &mut Ui, share: &Series, color_map: &ColorMap) {
    let total = share.total();
    let bars: Vec<Bar> = share
        .iter()
        .enumerate()
        .map(|(i, (group, value))| {
            let label = group.to_string();
            let percent = if total > 0.0 { value / total * 100.0 } else { 0.0 };
            Bar::new(i as f64, percent)
                .name(format!("{label}: {percent:.1}%"))
                .fill(color_map.color_for(&label))
                .width(0.7)
        })
        .collect();

    Plot::new("customer_share")
        .height(CHART_HEIGHT)
        .y_axis_label("% of customers")
        .x_axis_formatter(index_formatter(labels(share)))
        .allow_drag(false)
        .show(ui, |plot_ui| plot_ui.bar_chart(BarChart::new(bars)));
}

fn rfm_section(ui: &mut Ui, rfm: &RfmAnalysis) {
    let Some(summary) = &rfm.summary else {
        ui.weak("No identified customers in the selection.");
        return;
    };

    ui.columns(2, |cols: &mut [Ui]| {
        cols[0].strong("RFM Summary");
        egui::Grid::new("rfm_summary")
            .striped(true)
            .show(&mut cols[0], |ui: &mut Ui| {
                ui.label("");
                for name in ["Recency", "Frequency", "Monetary"] {
                    ui.strong(name);
                }
                ui.end_row();

                let columns = [&summary.recency, &summary.frequency, &summary.monetary];
                let rows: [(&str, fn(&Summary) -> String); 8] = [
                    ("count", |s: &Summary| s.count.to_string()),
                    ("mean", |s: &Summary| format!("{:.2}", s.mean)),
                    ("std", |s: &Summary| s.std.map(|v| format!("{v:.2}")).unwrap_or_else(|| "-".into())),
                    ("min", |s: &Summary| format!("{:.2}", s.min)),
                    ("25%", |s: &Summary| format!("{:.2}", s.p25)),
                    ("50%", |s: &Summary| format!("{:.2}", s.median)),
                    ("75%", |s: &Summary| format!("{:.2}", s.p75)),
                    ("max", |s: &Summary| format!("{:.2}", s.max)),
                ];
                for (name, cell) in rows {
                    ui.label(name);
                    for column in columns {
                        ui.label(cell(column));
                    }
                    ui.end_row();
                }
            });

        cols[1].strong("Customer Segmentation (RFM)");
        rfm_scatter(&mut cols[1], rfm, summary.monetary.max);
    });
}

/// Recency against frequency, shaded by monetary value.
fn rfm_scatter(ui: &mut Ui, rfm: &RfmAnalysis, max_monetary: f64) {
    Plot::new("rfm_scatter")
        .height(CHART_HEIGHT)
        .x_axis_label("Recency (days)")
        .y_axis_label("Frequency (orders)")
        .show(ui, |plot_ui| {
            for row in &rfm.rows {
                let t = if max_monetary > 0.0 {
                    row.monetary.max(0.0) / max_monetary
                } else {
                    0.0
                };
                plot_ui.points(
                    Points::new(vec![[row.recency_days as f64, row.frequency as f64]])
                        .radius(3.0)
                        .color(ramp(t)),
                );
            }
        });
}
