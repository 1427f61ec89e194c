//! Fraudwatch is a web dashboard for monitoring transactions scored by a
//! remote fraud detection service.
//!
//! This library provides a web server that directly serves HTML pages. It
//! loads transactions from the scoring API, folds in live pushes from the
//! notification hub, and submits single transactions and CSV batch imports
//! for scoring.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum_server::Handle;
use tokio::signal;

mod alert;
mod api;
mod app_state;
mod batch_import;
mod config;
mod dashboard;
mod endpoints;
mod error;
mod html;
mod live;
mod navigation;
mod not_found;
mod routing;
mod timezone;
mod transaction;

#[cfg(test)]
mod test_utils;

pub use api::{HttpTransactionApi, TransactionApi};
pub use app_state::AppState;
pub use batch_import::DEFAULT_BATCH_SIZE;
pub use config::{AppConfig, DEFAULT_TIMEZONE, parse_reconnect_delays};
pub use dashboard::DashboardStore;
pub use error::Error;
pub use live::{
    LiveHandle, PushConnection, PushTransport, ReconnectPolicy, WebSocketTransport,
    spawn_live_ingestion,
};
pub use routing::build_router;
pub use transaction::{NewTransaction, Transaction, TransactionId};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}
