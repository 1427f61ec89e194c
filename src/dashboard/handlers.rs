//! Dashboard HTTP handlers and view rendering.
//!
//! This module contains:
//! - Route handlers for displaying the dashboard and refreshing its data
//! - The endpoint for submitting a single transaction
//! - HTML view functions for rendering the dashboard UI

use std::sync::Arc;

use axum::{
    extract::{FromRef, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Form;
use axum_htmx::HxRefresh;
use maud::{Markup, html};
use serde::Deserialize;
use time::{OffsetDateTime, UtcOffset};

use crate::{
    AppState, Error,
    alert::Alert,
    api::TransactionApi,
    dashboard::{
        aggregation::summarize,
        cards::{fraud_breakdown_view, summary_cards_view},
        charts::{ECHARTS_SCRIPT, build_dashboard_charts, charts_script, charts_view},
        controller::{refresh_transactions, submit_transaction},
        filter::{FilterForm, FilterSpec, filter_transactions},
        forms::{filter_form_view, new_transaction_form_view},
        state::{Action, DashboardState, DashboardStore, Notice, NoticeKind},
        tables::transactions_table,
    },
    endpoints,
    html::{BUTTON_PRIMARY_STYLE, HeadElement, PAGE_CONTAINER_STYLE, base, format_currency, link},
    navigation::NavBar,
    timezone::require_local_offset,
    transaction::NewTransaction,
};

/// The state needed by the dashboard handlers.
#[derive(Clone)]
pub struct DashboardPageState {
    /// The scoring API the transactions are loaded from.
    pub api: Arc<dyn TransactionApi>,
    pub store: DashboardStore,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for DashboardPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            api: state.api.clone(),
            store: state.store.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The form for submitting a single transaction.
#[derive(Debug, Deserialize)]
pub struct NewTransactionForm {
    pub amount: f64,
    pub location: String,
    pub device: String,
}

/// Load the transactions if no refresh has completed yet.
///
/// A failed load is recorded as a notice and is not an error.
pub(super) async fn ensure_loaded(
    store: &DashboardStore,
    api: &dyn TransactionApi,
) -> Result<(), Error> {
    if store.read(|state| state.has_loaded)? {
        return Ok(());
    }

    if let Err(error) = refresh_transactions(store, api).await {
        tracing::warn!("Showing the dashboard without transactions: {error}");
    }

    Ok(())
}

/// Display the dashboard, with the transaction table narrowed down by the
/// filters in the query string.
///
/// The page is always rendered with the filter from its own query string,
/// the store is shared by every client.
pub async fn get_dashboard_page(
    State(state): State<DashboardPageState>,
    Query(form): Query<FilterForm>,
) -> Result<Response, Error> {
    let local_offset = require_local_offset(&state.local_timezone)?;
    let filter = FilterSpec::try_from(form)?;

    state.store.dispatch(Action::FilterChanged(filter.clone()))?;
    ensure_loaded(&state.store, state.api.as_ref()).await?;

    let snapshot = state.store.take_snapshot()?;

    Ok(dashboard_view(&snapshot, &filter, local_offset).into_response())
}

/// Fetch the transactions again and reload the dashboard.
///
/// On failure the previous transactions are kept and an alert is shown.
pub async fn post_refresh(State(state): State<DashboardPageState>) -> Response {
    match refresh_transactions(&state.store, state.api.as_ref()).await {
        Ok(()) => (HxRefresh(true), StatusCode::OK).into_response(),
        Err(error) => error.into_alert_response(),
    }
}

/// Submit a transaction from the new transaction form to the scoring API.
pub async fn create_transaction_endpoint(
    State(state): State<DashboardPageState>,
    Form(form): Form<NewTransactionForm>,
) -> Response {
    let location = form.location.trim();
    let device = form.device.trim();

    if !form.amount.is_finite() || location.is_empty() || device.is_empty() {
        return Error::InvalidForm(
            "A transaction needs an amount, a location and a device".to_owned(),
        )
        .into_alert_response();
    }

    let transaction = NewTransaction {
        amount: form.amount,
        location: location.to_owned(),
        device: device.to_owned(),
        time: OffsetDateTime::now_utc(),
    };

    match submit_transaction(&state.store, state.api.as_ref(), &transaction).await {
        Ok(Some(processed)) => {
            let classification = if processed.is_fraud {
                "fraudulent"
            } else {
                "legitimate"
            };

            (
                StatusCode::CREATED,
                Alert::Success {
                    message: "Transaction processed successfully".to_owned(),
                    details: format!(
                        "{} from {} was classified as {classification}.",
                        format_currency(processed.amount),
                        processed.location
                    ),
                }
                .into_html(),
            )
                .into_response()
        }
        Ok(None) => (
            StatusCode::ACCEPTED,
            Alert::Success {
                message: "Transaction processed successfully".to_owned(),
                details: format!(
                    "{} from {} will show up in the live feed once it has been classified.",
                    format_currency(transaction.amount),
                    transaction.location
                ),
            }
            .into_html(),
        )
            .into_response(),
        Err(error) => (
            StatusCode::BAD_GATEWAY,
            Alert::Error {
                message: "Failed to process transaction".to_owned(),
                details: error.to_string(),
            }
            .into_html(),
        )
            .into_response(),
    }
}

fn notice_view(notice: &Notice) -> Markup {
    let style = match notice.kind {
        NoticeKind::Info => "text-blue-800 border-blue-300 bg-blue-50 dark:text-blue-400",
        NoticeKind::Success => "text-green-800 border-green-300 bg-green-50 dark:text-green-400",
        NoticeKind::Warning => "text-yellow-800 border-yellow-300 bg-yellow-50 dark:text-yellow-300",
        NoticeKind::Error => "text-red-800 border-red-300 bg-red-50 dark:text-red-400",
    };

    html! {
        div
            id="notice"
            role="status"
            class={ "w-full p-4 mb-4 rounded-lg border dark:bg-gray-800 " (style) }
        {
            (notice.message)
        }
    }
}

fn refresh_button(is_loading: bool) -> Markup {
    html! {
        button
            id="refresh-button"
            type="button"
            hx-post=(endpoints::REFRESH)
            hx-swap="none"
            hx-target-error="#alert-container"
            hx-disabled-elt="this"
            disabled[is_loading]
            class={ (BUTTON_PRIMARY_STYLE) " md:w-auto" }
        {
            "Refresh Transactions"
        }
    }
}

fn live_feed_container() -> Markup {
    html! {
        div
            id="live-feed"
            class="w-full mb-6"
            hx-get=(endpoints::LIVE_FEED)
            hx-trigger="load, every 5s"
            hx-swap="innerHTML"
        {}
    }
}

/// Renders the dashboard page for `state` with the table narrowed down by `filter`.
fn dashboard_view(state: &DashboardState, filter: &FilterSpec, local_offset: UtcOffset) -> Markup {
    let nav_bar = NavBar::new(endpoints::DASHBOARD_VIEW).into_html();
    let filtered = filter_transactions(&state.transactions, filter, local_offset);
    let stats = summarize(&state.transactions);
    let charts = build_dashboard_charts(&state.transactions, local_offset);
    let filter_form = FilterForm::from(filter);
    let import_link = link(endpoints::IMPORT_VIEW, "importing a CSV file");

    let content = html!(
        (nav_bar)

        div id="dashboard-content" class=(PAGE_CONTAINER_STYLE)
        {
            div class="flex w-full justify-between items-center mb-6"
            {
                h1 class="text-2xl font-bold" { "Transaction Dashboard" }
                (refresh_button(state.is_loading))
            }

            @if let Some(notice) = &state.notice {
                (notice_view(notice))
            }

            (filter_form_view(&filter_form))
            (summary_cards_view(&stats))

            @if state.transactions.is_empty() {
                section id="no-data" class="w-full mb-6 text-center"
                {
                    h2 class="text-xl font-bold" { "Nothing here yet..." }
                    p
                    {
                        "Charts will show up here once the scoring service has processed
                        some transactions. You can submit one below or start by "
                        (import_link) "."
                    }
                }
            } @else {
                (charts_view(&charts))
            }

            (live_feed_container())

            div class="grid grid-cols-1 md:grid-cols-2 gap-6 w-full mb-6"
            {
                (new_transaction_form_view())
                (fraud_breakdown_view(&stats))
            }

            (transactions_table(&filtered, state.transactions.len(), local_offset))
        }
    );

    let scripts = [
        HeadElement::ScriptLink(ECHARTS_SCRIPT.to_owned()),
        charts_script(&charts),
    ];

    base("Dashboard", &scripts, &content)
}
