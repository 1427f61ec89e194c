//! The transaction detail page.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use time::{UtcOffset, format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    Error,
    dashboard::{
        charts::{DashboardChart, ECHARTS_SCRIPT, charts_script, transaction_history_chart},
        controller::select_transaction,
        handlers::{DashboardPageState, ensure_loaded},
        state::Selection,
        tables::status_badge,
    },
    endpoints,
    html::{
        CARD_STYLE, HeadElement, PAGE_CONTAINER_STYLE, base, format_currency, format_score, link,
    },
    navigation::NavBar,
    timezone::require_local_offset,
    transaction::{Transaction, TransactionId},
};

const DATE_TIME_FORMAT: &[BorrowedFormatItem] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// The background colour of the score badge for `score`.
///
/// Scores below -0.5 are red, other negative scores are yellow, and the rest
/// are green.
pub fn score_color(score: f64) -> &'static str {
    if score < -0.5 {
        "bg-red-500"
    } else if score < 0.0 {
        "bg-yellow-500"
    } else {
        "bg-green-500"
    }
}

/// Display the details of a transaction together with its similar transactions.
pub async fn get_transaction_page(
    State(state): State<DashboardPageState>,
    Path(transaction_id): Path<i64>,
) -> Result<Response, Error> {
    let local_offset = require_local_offset(&state.local_timezone)?;

    ensure_loaded(&state.store, state.api.as_ref()).await?;

    let selection = select_transaction(
        &state.store,
        state.api.as_ref(),
        TransactionId::new(transaction_id),
    )
    .await?;

    Ok(transaction_detail_view(&selection, local_offset).into_response())
}

fn info_row(label: &str, value: &str) -> Markup {
    html! {
        div
        {
            dt class="text-sm text-gray-500 dark:text-gray-400" { (label) }
            dd class="font-semibold" { (value) }
        }
    }
}

fn basic_info_view(transaction: &Transaction, local_offset: UtcOffset) -> Markup {
    let time = transaction
        .time
        .to_offset(local_offset)
        .format(DATE_TIME_FORMAT)
        .unwrap_or_else(|_| transaction.time_rfc3339());

    html! {
        dl id="basic-info" class={ (CARD_STYLE) " space-y-4" }
        {
            (info_row("Amount", &format_currency(transaction.amount)))
            (info_row("Time", &time))
            (info_row("Location", &transaction.location))
            (info_row("Device", &transaction.device))
        }
    }
}

fn risk_factors_view(transaction: &Transaction) -> Markup {
    let deviation = (transaction.effective_score().abs() * 100.0).min(100.0);

    html! {
        section class=(CARD_STYLE)
        {
            h3 class="text-lg font-semibold mb-4" { "Risk Factors" }

            div class="flex justify-between items-center"
            {
                span { "Amount Deviation" }
                div class="w-48 h-2 bg-gray-200 rounded-full overflow-hidden"
                {
                    div
                        id="amount-deviation"
                        class="h-full bg-blue-500"
                        style=(format!("width: {deviation:.0}%"))
                    {}
                }
            }
        }
    }
}

fn transaction_detail_view(selection: &Selection, local_offset: UtcOffset) -> Markup {
    let nav_bar = NavBar::new(endpoints::DASHBOARD_VIEW).into_html();
    let transaction = &selection.transaction;
    let score = transaction.effective_score();
    let back_link = link(endpoints::DASHBOARD_VIEW, "Back to dashboard");

    let history_chart = DashboardChart {
        id: "history-chart",
        options: transaction_history_chart(&selection.similar, local_offset).to_string(),
    };
    let charts = [history_chart];

    let content = html!(
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="flex w-full justify-between items-center mb-6"
            {
                h1 class="text-2xl font-bold" { "Transaction Details #" (transaction.id.as_i64()) }
                p { (back_link) }
            }

            div class="grid grid-cols-1 md:grid-cols-2 gap-6 w-full"
            {
                div class="space-y-6"
                {
                    section id="status" class={ (CARD_STYLE) " flex items-center justify-between" }
                    {
                        (status_badge(transaction.is_fraud))

                        span
                            id="score-badge"
                            class={ "px-4 py-1 rounded-full text-white " (score_color(score)) }
                        {
                            "Score: " (format_score(score))
                        }
                    }

                    (basic_info_view(transaction, local_offset))
                }

                div class="space-y-6"
                {
                    section class=(CARD_STYLE)
                    {
                        h3 class="text-lg font-semibold mb-4" { "Transaction History" }

                        @if selection.similar.is_empty() {
                            p id="no-history" class="h-64 flex items-center justify-center"
                            {
                                "No similar transactions found."
                            }
                        } @else {
                            div id=(charts[0].id) class="min-h-[256px] rounded dark:bg-gray-100" {}
                        }
                    }

                    (risk_factors_view(transaction))
                }
            }
        }
    );

    let scripts = if selection.similar.is_empty() {
        Vec::new()
    } else {
        vec![
            HeadElement::ScriptLink(ECHARTS_SCRIPT.to_owned()),
            charts_script(&charts),
        ]
    };

    base("Transaction Details", &scripts, &content)
}
