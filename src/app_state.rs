//! Implements a struct that holds the state of the dashboard server.

use std::sync::Arc;

use crate::{api::TransactionApi, config::AppConfig, dashboard::DashboardStore, live::LiveHandle};

/// The state of the dashboard server.
///
/// Route handlers take the narrower sub-states that implement `FromRef<AppState>`.
#[derive(Clone)]
pub struct AppState {
    /// The client for the remote scoring API.
    pub api: Arc<dyn TransactionApi>,

    /// The transactions, filters and notices shared by every request.
    pub store: DashboardStore,

    /// The live feed and push hub connection state.
    pub live: LiveHandle,

    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,

    /// How many transactions to send per batch during an import.
    pub batch_size: usize,
}

impl AppState {
    /// Create a new [AppState] from validated settings.
    pub fn new(
        api: Arc<dyn TransactionApi>,
        store: DashboardStore,
        live: LiveHandle,
        config: &AppConfig,
    ) -> Self {
        Self {
            api,
            store,
            live,
            local_timezone: config.local_timezone.clone(),
            batch_size: config.batch_size,
        }
    }
}
