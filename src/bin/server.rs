use std::{fs::OpenOptions, net::SocketAddr, path::PathBuf, sync::Arc};

use axum::{
    Router,
    extract::{MatchedPath, Request},
};
use axum_server::{Handle, tls_rustls::RustlsConfig};
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use fraudwatch::{
    AppConfig, AppState, DEFAULT_BATCH_SIZE, DEFAULT_TIMEZONE, DashboardStore,
    HttpTransactionApi, LiveHandle, WebSocketTransport, build_router, graceful_shutdown,
    spawn_live_ingestion,
};

/// The web server for the fraudwatch dashboard.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The base URL of the transaction scoring API, e.g. "http://localhost:5000".
    #[arg(long)]
    api_url: String,

    /// The WebSocket URL of the push hub, e.g. "ws://localhost:5000/transactionHub".
    ///
    /// The live feed stays disconnected if this is not set.
    #[arg(long)]
    hub_url: Option<String>,

    /// File path to an SSL certificate `cert.pem` and key `key.pem`.
    ///
    /// The server uses plain HTTP if this is not set.
    #[arg(long)]
    cert_path: Option<String>,

    /// The port to serve the dashboard from.
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// The canonical name of the local timezone, e.g. "Pacific/Auckland".
    #[arg(long, default_value = DEFAULT_TIMEZONE)]
    timezone: String,

    /// How many transactions to send per request during a batch import.
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Comma-separated seconds to wait before each push hub connection attempt.
    #[arg(long, default_value = "0,2,10,30")]
    reconnect_delays: String,
}

#[tokio::main]
async fn main() {
    setup_logging();

    let args = Args::parse();

    let config = AppConfig::new(&args.timezone, args.batch_size, &args.reconnect_delays)
        .expect("Invalid server settings");

    let api = HttpTransactionApi::new(&args.api_url).expect("Could not create the API client");
    let store = DashboardStore::default();

    let live = match &args.hub_url {
        Some(hub_url) => {
            tracing::info!("Connecting to the push hub at {hub_url}");
            spawn_live_ingestion(
                WebSocketTransport::new(hub_url),
                config.reconnect_policy.clone(),
                store.clone(),
            )
        }
        None => {
            tracing::warn!("No push hub URL given, the live feed is disabled");
            LiveHandle::disconnected()
        }
    };

    let state = AppState::new(Arc::new(api), store, live, &config);
    let router = add_tracing_layer(build_router(state));

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    match &args.cert_path {
        Some(cert_path) => {
            let tls_config = RustlsConfig::from_pem_file(
                PathBuf::from(cert_path).join("cert.pem"),
                PathBuf::from(cert_path).join("key.pem"),
            )
            .await
            .expect("Could not open TLS certificates.");

            tracing::info!("HTTPS server listening on {}", addr);
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(router.into_make_service())
                .await
                .expect("The server stopped unexpectedly");
        }
        None => {
            tracing::info!("HTTP server listening on {}", addr);
            axum_server::bind(addr)
                .handle(handle)
                .serve(router.into_make_service())
                .await
                .expect("The server stopped unexpectedly");
        }
    }
}

fn setup_logging() {
    let stdout_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")
        .expect("Could not create log file");

    let debug_log = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(Arc::new(log_file))
        .with_filter(filter::LevelFilter::DEBUG);

    tracing_subscriber::registry()
        .with(stdout_log)
        .with(debug_log)
        .init();
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // Errors are logged where they are converted into responses.
        .on_failure(());

    router.layer(tracing_layer)
}
