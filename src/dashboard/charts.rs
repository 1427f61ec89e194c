//! Chart generation and rendering for the dashboard.
//!
//! This module creates interactive ECharts visualizations for transaction data:
//! - **Daily Volume Chart**: Transactions and fraudulent transactions per day
//! - **Risk Distribution Chart**: Transactions per anomaly score band
//! - **Location and Device Charts**: How transactions are spread across locations and devices
//! - **Transaction Trend Chart**: The amounts of the most recent transactions
//! - **Transaction History Chart**: Amounts of similar transactions on the detail page
//!
//! Each chart is generated as JSON configuration for the ECharts library and
//! rendered with corresponding HTML containers and JavaScript initialization code.

use charming::{
    Chart,
    component::{Axis, Grid, Legend, Title},
    element::{
        AxisLabel, AxisPointer, AxisPointerType, AxisType, Emphasis, EmphasisFocus, JsFunction,
        Tooltip, Trigger,
    },
    series::{Line, Pie, bar},
};
use maud::{Markup, PreEscaped, html};
use time::{UtcOffset, format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    dashboard::aggregation::{GroupField, daily_volume, group_by, recent_trend, risk_histogram},
    html::HeadElement,
    transaction::Transaction,
};

/// The number of transactions shown in the trend chart.
pub(super) const TREND_LENGTH: usize = 10;

const DATE_LABEL_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");
const TIME_LABEL_FORMAT: &[BorrowedFormatItem] = format_description!("[hour]:[minute]");

/// The ECharts library, served from the static directory.
pub(super) const ECHARTS_SCRIPT: &str = "/static/echarts.6.0.0.min.js";

/// A dashboard chart with its HTML container ID and ECharts configuration.
pub(super) struct DashboardChart {
    /// The HTML element ID to use for the chart (kebab-case)
    pub id: &'static str,
    /// The ECharts configuration as a JSON string
    pub options: String,
}

/// Renders the HTML containers for dashboard charts.
pub(super) fn charts_view(charts: &[DashboardChart]) -> Markup {
    html!(
        section
            id="charts"
            class="w-full mx-auto mb-4"
        {
            div class="grid grid-cols-1 xl:grid-cols-2 gap-4"
            {
                @for chart in charts {
                    div
                        id=(chart.id)
                        class="min-h-[380px] rounded dark:bg-gray-100"
                    {}
                }
            }
        }
    )
}

/// Make chart options safe to paste into an inline `<script>` element.
///
/// Locations and devices come from remote services, so a label such as
/// `</script>` must not be able to close the element.
fn escape_inline_script(options: &str) -> String {
    options.replace("</", "<\\/").replace("<!--", "<\\!--")
}

/// Generates JavaScript initialization code for dashboard charts.
///
/// Creates scripts that initialize ECharts instances with dark mode support
/// and responsive resizing.
pub(super) fn charts_script(charts: &[DashboardChart]) -> HeadElement {
    let script_content = charts
        .iter()
        .map(|chart| {
            format!(
                r#"(function() {{
                    const chartDom = document.getElementById("{}");
                    if (!chartDom) {{
                        return;
                    }}
                    const chart = echarts.init(chartDom);
                    const option = {};
                    chart.setOption(option);

                    window.addEventListener('resize', chart.resize);

                    const darkModeMediaQuery = window.matchMedia('(prefers-color-scheme: dark)');
                    const updateTheme = () => {{
                        const isDarkMode = darkModeMediaQuery.matches;
                        chart.setTheme(isDarkMode ? 'dark' : 'default');
                    }}
                    darkModeMediaQuery.addEventListener('change', updateTheme);
                    updateTheme();
                }})();"#,
                chart.id,
                escape_inline_script(&chart.options)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let wrapped_script = format!(
        "document.addEventListener('DOMContentLoaded', function() {{\n{}\n}});",
        script_content
    );

    HeadElement::ScriptSource(PreEscaped(wrapped_script))
}

/// Creates the dashboard charts for `transactions`.
///
/// Dates and times are shown in the timezone `local_offset`.
pub(super) fn build_dashboard_charts(
    transactions: &[Transaction],
    local_offset: UtcOffset,
) -> [DashboardChart; 5] {
    [
        DashboardChart {
            id: "daily-volume-chart",
            options: daily_volume_chart(transactions, local_offset).to_string(),
        },
        DashboardChart {
            id: "risk-distribution-chart",
            options: risk_distribution_chart(transactions).to_string(),
        },
        DashboardChart {
            id: "location-chart",
            options: distribution_chart(transactions, GroupField::Location).to_string(),
        },
        DashboardChart {
            id: "device-chart",
            options: distribution_chart(transactions, GroupField::Device).to_string(),
        },
        DashboardChart {
            id: "trend-chart",
            options: trend_chart(transactions, local_offset).to_string(),
        },
    ]
}

fn daily_volume_chart(transactions: &[Transaction], local_offset: UtcOffset) -> Chart {
    let volume = daily_volume(transactions, local_offset);
    let labels: Vec<String> = volume
        .iter()
        .map(|day| day.date.format(DATE_LABEL_FORMAT).unwrap_or_default())
        .collect();
    let totals: Vec<f64> = volume.iter().map(|day| day.total as f64).collect();
    let fraudulent: Vec<f64> = volume.iter().map(|day| day.fraudulent as f64).collect();

    Chart::new()
        .title(Title::new().text("Daily Transaction Volume"))
        .tooltip(count_tooltip())
        .legend(Legend::new().left(250).top("1%"))
        .grid(chart_grid())
        .x_axis(Axis::new().type_(AxisType::Category).data(labels))
        .y_axis(Axis::new().type_(AxisType::Value))
        .series(Line::new().name("Total Transactions").data(totals))
        .series(Line::new().name("Fraudulent Transactions").data(fraudulent))
}

fn risk_distribution_chart(transactions: &[Transaction]) -> Chart {
    let bins = risk_histogram(transactions);
    let labels: Vec<String> = bins.iter().map(|bin| bin.level.label().to_owned()).collect();
    let counts: Vec<f64> = bins.iter().map(|bin| bin.count as f64).collect();

    Chart::new()
        .title(
            Title::new()
                .text("Risk Score Distribution")
                .subtext("Transactions per anomaly score band"),
        )
        .tooltip(count_tooltip())
        .grid(chart_grid())
        .x_axis(Axis::new().type_(AxisType::Category).data(labels))
        .y_axis(Axis::new().type_(AxisType::Value))
        .series(
            bar::Bar::new()
                .name("Transactions")
                .emphasis(Emphasis::new().focus(EmphasisFocus::Series))
                .data(counts),
        )
}

fn distribution_chart(transactions: &[Transaction], field: GroupField) -> Chart {
    let groups = group_by(transactions, field);
    let title = match field {
        GroupField::Location => "Transactions by Location",
        GroupField::Device => "Transactions by Device",
    };
    let data: Vec<(f64, &str)> = groups
        .iter()
        .map(|group| (group.count as f64, group.name.as_str()))
        .collect();

    Chart::new()
        .title(Title::new().text(title))
        .tooltip(Tooltip::new().trigger(Trigger::Item))
        .series(
            Pie::new()
                .name(title)
                .radius(vec!["40%", "70%"])
                .data(data),
        )
}

fn trend_chart(transactions: &[Transaction], local_offset: UtcOffset) -> Chart {
    let points = recent_trend(transactions, TREND_LENGTH);
    let labels: Vec<String> = points
        .iter()
        .map(|point| {
            point
                .time
                .to_offset(local_offset)
                .format(TIME_LABEL_FORMAT)
                .unwrap_or_default()
        })
        .collect();
    let amounts: Vec<f64> = points.iter().map(|point| point.amount).collect();

    Chart::new()
        .title(
            Title::new()
                .text("Transaction Trend")
                .subtext(format!("Last {TREND_LENGTH} transactions")),
        )
        .tooltip(currency_tooltip())
        .grid(chart_grid())
        .x_axis(Axis::new().type_(AxisType::Category).data(labels))
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter())),
        )
        .series(Line::new().name("Amount").data(amounts))
}

/// Plots the amounts of the transactions similar to the selected one over time.
pub(super) fn transaction_history_chart(
    similar: &[Transaction],
    local_offset: UtcOffset,
) -> Chart {
    let mut similar: Vec<&Transaction> = similar.iter().collect();
    similar.sort_by_key(|transaction| transaction.time);

    let labels: Vec<String> = similar
        .iter()
        .map(|transaction| {
            transaction
                .local_date(local_offset)
                .format(DATE_LABEL_FORMAT)
                .unwrap_or_default()
        })
        .collect();
    let amounts: Vec<f64> = similar.iter().map(|transaction| transaction.amount).collect();

    Chart::new()
        .title(Title::new().text("Transaction History"))
        .tooltip(currency_tooltip())
        .grid(chart_grid())
        .x_axis(Axis::new().type_(AxisType::Category).data(labels))
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter())),
        )
        .series(Line::new().name("Amount").data(amounts))
}

fn chart_grid() -> Grid {
    Grid::new()
        .left("3%")
        .right("4%")
        .bottom("3%")
        .top(90)
        .contain_label(true)
}

#[inline]
fn currency_formatter() -> JsFunction {
    JsFunction::new_with_args(
        "number",
        "const currencyFormatter = new Intl.NumberFormat('en-US', {
              style: 'currency',
              currency: 'USD'
            });
            return (number) ? currencyFormatter.format(number) : \"-\";",
    )
}

/// Creates a tooltip configuration for currency values
fn currency_tooltip() -> Tooltip {
    Tooltip::new()
        .trigger(Trigger::Axis)
        .value_formatter(currency_formatter())
        .axis_pointer(AxisPointer::new().type_(AxisPointerType::Shadow))
}

fn count_tooltip() -> Tooltip {
    Tooltip::new()
        .trigger(Trigger::Axis)
        .axis_pointer(AxisPointer::new().type_(AxisPointerType::Shadow))
}
