//! The endpoint that receives an uploaded CSV file and imports it in batches.
//!
//! The whole file is parsed before anything is sent, so a malformed file
//! imports nothing.

use std::sync::Arc;

use axum::{
    extract::{FromRef, Multipart, State, multipart::Field},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    alert::Alert,
    api::TransactionApi,
    batch_import::{
        coordinator::{BatchImportError, BatchProgress, run_batch_import},
        csv::parse_csv,
    },
};

/// The state needed for batch imports.
#[derive(Clone)]
pub struct ImportState {
    /// The scoring API the batches are submitted to.
    pub api: Arc<dyn TransactionApi>,
    /// The number of transactions per batch request.
    pub batch_size: usize,
}

impl FromRef<AppState> for ImportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            api: state.api.clone(),
            batch_size: state.batch_size,
        }
    }
}

/// Route handler for importing transactions from an uploaded CSV file.
///
/// Every row is parsed before anything is sent, so a malformed file is
/// rejected without submitting any batches.
pub async fn import_transactions(
    State(state): State<ImportState>,
    mut multipart: Multipart,
) -> Response {
    let start_time = std::time::Instant::now();
    let mut transactions = Vec::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(error) => {
                tracing::error!("Could not read multipart form: {error}");
                return Error::MultipartError(error.body_text()).into_alert_response();
            }
        };

        let result = match parse_multipart_field(field).await {
            Ok(csv_data) => parse_csv(&csv_data, OffsetDateTime::now_utc()),
            Err(error) => Err(error),
        };

        match result {
            Ok(parsed) => transactions.extend(parsed),
            Err(error) => {
                tracing::debug!("Rejected upload: {error}");
                return error.into_alert_response();
            }
        }
    }

    if transactions.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Alert::ErrorSimple {
                message: "The uploaded file has no transactions.".to_owned(),
            }
            .into_html(),
        )
            .into_response();
    }

    tracing::info!(
        "Importing {} transactions in batches of {}",
        transactions.len(),
        state.batch_size
    );

    let result = run_batch_import(
        state.api.as_ref(),
        &transactions,
        state.batch_size,
        |progress| {
            tracing::info!(
                "Batch import {}% complete ({}/{})",
                progress.percent_complete(),
                progress.processed,
                progress.total
            )
        },
    )
    .await;

    let duration = start_time.elapsed();

    match result {
        Ok(progress) => {
            tracing::info!(
                "Batch import of {} transactions completed in {}ms",
                progress.total,
                duration.as_millis()
            );
            (StatusCode::CREATED, import_succeeded(&progress).into_html()).into_response()
        }
        Err(error) => {
            tracing::error!(
                "Batch import stopped after {}ms: {error}",
                duration.as_millis()
            );
            (StatusCode::BAD_GATEWAY, import_failed(&error).into_html()).into_response()
        }
    }
}

fn tally(progress: &BatchProgress) -> String {
    format!(
        "Processed {} of {} transactions ({}%): {} successful, {} failed, {} fraudulent.",
        progress.processed,
        progress.total,
        progress.percent_complete(),
        progress.successful,
        progress.failed,
        progress.fraudulent
    )
}

fn import_succeeded(progress: &BatchProgress) -> Alert {
    Alert::Success {
        message: "Batch import completed".to_owned(),
        details: tally(progress),
    }
}

fn import_failed(error: &BatchImportError) -> Alert {
    Alert::Error {
        message: error.to_string(),
        details: tally(&error.progress),
    }
}

fn is_csv(field: &Field<'_>) -> bool {
    field.content_type() == Some("text/csv")
        || field
            .file_name()
            .is_some_and(|file_name| file_name.to_lowercase().ends_with(".csv"))
}

async fn parse_multipart_field(field: Field<'_>) -> Result<String, Error> {
    if !is_csv(&field) {
        return Err(Error::NotCSV);
    }

    let file_name = field.file_name().unwrap_or("upload.csv").to_owned();
    let data = match field.text().await {
        Ok(data) => data,
        Err(error) => {
            tracing::error!("Could not read data from multipart form field: {error}");
            return Err(Error::MultipartError(
                "Could not read data from multipart form field.".to_owned(),
            ));
        }
    };

    tracing::debug!("Received file '{}' that is {} bytes", file_name, data.len());

    Ok(data)
}
