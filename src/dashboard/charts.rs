//! Pie charts showing where income comes from and where expenses go.
//!
//! Each chart is generated as JSON configuration for the ECharts library and
//! rendered with its HTML container and the JavaScript that initializes it.
//! The summary fragment is swapped in by htmx, so the script runs inline
//! instead of on `DOMContentLoaded`.

use charming::{
    Chart,
    component::{Legend, Title},
    element::{JsFunction, Tooltip, Trigger},
    series::Pie,
};
use maud::{Markup, PreEscaped, html};

use crate::ledger::{CategoryTotal, TransactionKind};

/// A dashboard chart with its HTML container ID and ECharts configuration.
pub(super) struct DashboardChart {
    /// The HTML element ID to use for the chart (kebab-case)
    pub id: &'static str,
    /// Shown instead of the chart when there is nothing to plot.
    pub empty_message: &'static str,
    /// The ECharts configuration as a JSON string, `None` when there is no data.
    pub options: Option<String>,
}

impl DashboardChart {
    /// The distribution chart for `kind` built from its category totals.
    pub(super) fn distribution(kind: TransactionKind, totals: &[CategoryTotal]) -> Self {
        let (id, empty_message) = match kind {
            TransactionKind::Income => ("income-chart", "No income data yet"),
            TransactionKind::Expense => ("expense-chart", "No expense data yet"),
        };

        let options = (!totals.is_empty()).then(|| distribution_chart(kind, totals).to_string());

        Self {
            id,
            empty_message,
            options,
        }
    }
}

/// The chart title for the distribution of `kind`.
fn distribution_title(kind: TransactionKind) -> &'static str {
    match kind {
        TransactionKind::Income => "Income Distribution",
        TransactionKind::Expense => "Expense Distribution",
    }
}

fn distribution_chart(kind: TransactionKind, totals: &[CategoryTotal]) -> Chart {
    let data = totals
        .iter()
        .map(|total| (total.total, total.label.as_str()))
        .collect::<Vec<_>>();

    Chart::new()
        .title(Title::new().text(distribution_title(kind)).left("center"))
        .tooltip(
            Tooltip::new()
                .trigger(Trigger::Item)
                .value_formatter(currency_formatter()),
        )
        .legend(Legend::new().left("center").top("bottom"))
        .series(
            Pie::new()
                .name(kind.label_name())
                .radius(vec!["40%", "70%"])
                .data(data),
        )
}

/// Renders the chart containers and their initialization scripts.
pub(super) fn charts_view(charts: &[DashboardChart]) -> Markup {
    html!(
        section
            id="charts"
            class="w-full mx-auto mb-4"
        {
            div class="grid grid-cols-1 xl:grid-cols-2 gap-4"
            {
                @for chart in charts {
                    @match &chart.options {
                        Some(options) => {
                            div
                                id=(chart.id)
                                class="min-h-[380px] rounded dark:bg-gray-100"
                            {}

                            script { (chart_script(chart.id, options)) }
                        }
                        None => {
                            div
                                id=(chart.id)
                                class="flex items-center justify-center min-h-[380px] rounded
                                    bg-white dark:bg-gray-800 text-gray-500 dark:text-gray-400"
                            {
                                p { (chart.empty_message) }
                            }
                        }
                    }
                }
            }
        }
    )
}

fn chart_script(id: &str, options: &str) -> PreEscaped<String> {
    // Labels are user text and must not close the script tag.
    let options = options.replace("</", "<\\/");

    PreEscaped(format!(
        r#"(function() {{
            const chartDom = document.getElementById("{id}");
            if (!chartDom || typeof echarts === 'undefined') {{
                return;
            }}
            const chart = echarts.init(chartDom);
            const option = {options};
            chart.setOption(option);

            window.addEventListener('resize', chart.resize);

            const darkModeMediaQuery = window.matchMedia('(prefers-color-scheme: dark)');
            const updateTheme = () => {{
                const isDarkMode = darkModeMediaQuery.matches;
                chart.setTheme(isDarkMode ? 'dark' : 'default');
            }}
            darkModeMediaQuery.addEventListener('change', updateTheme);
            updateTheme();
        }})();"#
    ))
}

#[inline]
fn currency_formatter() -> JsFunction {
    JsFunction::new_with_args(
        "number",
        "const currencyFormatter = new Intl.NumberFormat('en-IN', {
              style: 'currency',
              currency: 'INR'
            });
            return (number) ? currencyFormatter.format(number) : \"-\";",
    )
}
