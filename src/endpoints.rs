//! The endpoint URIs served by the dashboard.
//!
//! For endpoints that take a parameter, e.g., '/transactions/{transaction_id}', use [format_endpoint].

/// The root route which redirects to the dashboard.
pub const ROOT: &str = "/";
/// The landing page with statistics, charts, filters and the live feed.
pub const DASHBOARD_VIEW: &str = "/dashboard";
/// The partial with the live transaction feed and fraud alerts, polled by the dashboard.
pub const LIVE_FEED: &str = "/dashboard/live";
/// The page showing the details and history of a single transaction.
pub const TRANSACTION_VIEW: &str = "/transactions/{transaction_id}";
/// The page for uploading a CSV file of transactions.
pub const IMPORT_VIEW: &str = "/import";
/// The route for static files.
pub const STATIC: &str = "/static";

/// The route that fetches all transactions from the scoring API again.
pub const REFRESH: &str = "/api/refresh";
/// The route to submit a single transaction for processing.
pub const TRANSACTIONS_API: &str = "/api/transactions";
/// The route to upload a CSV file for batch processing.
pub const IMPORT: &str = "/api/import";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is the text between the first '{' and the following '}',
/// e.g. '{transaction_id}' in '/transactions/{transaction_id}'.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: impl std::fmt::Display) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_owned();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|offset| param_start + offset + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
