//! The live feed panel, polled by the dashboard page.

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use time::{UtcOffset, format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    AppState, Error,
    html::{CARD_STYLE, format_currency, format_score},
    live::{
        feed::LiveFeed,
        reconciler::{ConnectionState, LiveHandle},
    },
    timezone::require_local_offset,
    transaction::Transaction,
};

const TIME_FORMAT: &[BorrowedFormatItem] = format_description!("[hour]:[minute]:[second]");

/// The state needed for the live feed panel.
#[derive(Debug, Clone)]
pub struct LiveFeedState {
    pub live: LiveHandle,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for LiveFeedState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            live: state.live.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Route handler for the live feed partial.
pub async fn get_live_feed(State(state): State<LiveFeedState>) -> Response {
    let result = require_local_offset(&state.local_timezone)
        .and_then(|offset| Ok((offset, state.live.snapshot()?)));

    match result {
        Ok((local_offset, feed)) => {
            live_feed_view(&feed, state.live.connection_state(), local_offset).into_response()
        }
        Err(error) => error.into_alert_response(),
    }
}

fn format_time(transaction: &Transaction, local_offset: UtcOffset) -> String {
    transaction
        .time
        .to_offset(local_offset)
        .format(TIME_FORMAT)
        .unwrap_or_default()
}

fn connection_badge(state: ConnectionState) -> Markup {
    let style = match state {
        ConnectionState::Connected => "bg-green-100 text-green-800 dark:bg-green-900 dark:text-green-300",
        ConnectionState::Connecting | ConnectionState::Reconnecting => {
            "bg-yellow-100 text-yellow-800 dark:bg-yellow-900 dark:text-yellow-300"
        }
        ConnectionState::Disconnected => "bg-gray-100 text-gray-800 dark:bg-gray-700 dark:text-gray-300",
    };

    html! {
        span
            id="connection-state"
            class={ "text-xs font-medium px-2.5 py-0.5 rounded-full " (style) }
        {
            (state.label())
        }
    }
}

pub(crate) fn live_feed_view(
    feed: &LiveFeed,
    connection_state: ConnectionState,
    local_offset: UtcOffset,
) -> Markup {
    html! {
        div class="grid grid-cols-1 md:grid-cols-2 gap-6 w-full"
        {
            section id="recent-transactions" class=(CARD_STYLE)
            {
                div class="flex items-center justify-between mb-4"
                {
                    h3 class="text-lg font-semibold" { "Live Transaction Feed" }
                    (connection_badge(connection_state))
                }

                ul class="space-y-4 max-h-[400px] overflow-y-auto"
                {
                    @for transaction in feed.recent() {
                        @let style = if transaction.is_fraud {
                            "p-3 rounded-lg border bg-red-50 border-red-200 dark:bg-red-950 dark:border-red-800"
                        } else {
                            "p-3 rounded-lg border bg-green-50 border-green-200 dark:bg-green-950 dark:border-green-800"
                        };

                        li class=(style)
                        {
                            div class="flex justify-between items-start"
                            {
                                div
                                {
                                    p class="font-semibold" { (format_currency(transaction.amount)) }
                                    p class="text-sm text-gray-600 dark:text-gray-400" { (transaction.location) }
                                }

                                div class="text-right"
                                {
                                    p class="text-sm text-gray-600 dark:text-gray-400"
                                    {
                                        (format_time(transaction, local_offset))
                                    }
                                    p class="text-sm" { (transaction.device) }
                                }
                            }
                        }
                    } @if feed.recent().next().is_none() {
                        li class="text-sm text-gray-500" { "Waiting for transactions..." }
                    }
                }
            }

            section id="fraud-alerts" class=(CARD_STYLE)
            {
                h3 class="text-lg font-semibold mb-4 text-red-600 dark:text-red-400" { "Fraud Alerts" }

                ul class="space-y-4 max-h-[400px] overflow-y-auto"
                {
                    @for transaction in feed.alerts() {
                        li class="p-3 rounded-lg bg-red-50 border border-red-200 dark:bg-red-950 dark:border-red-800"
                        {
                            div class="flex justify-between items-start"
                            {
                                div
                                {
                                    p class="font-semibold text-red-600 dark:text-red-400"
                                    {
                                        "Suspicious Transaction Detected"
                                    }
                                    p class="text-sm text-gray-600 dark:text-gray-400"
                                    {
                                        "Amount: " (format_currency(transaction.amount))
                                    }
                                    p class="text-sm text-gray-600 dark:text-gray-400"
                                    {
                                        "Location: " (transaction.location)
                                    }
                                }

                                div class="text-right"
                                {
                                    p class="text-sm text-gray-600 dark:text-gray-400"
                                    {
                                        (format_time(transaction, local_offset))
                                    }
                                    p class="text-sm"
                                    {
                                        "Risk Score: " (format_score(transaction.anomaly_score))
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}
