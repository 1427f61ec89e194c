//! Defines the app level error type and conversions to rendered HTML pages and alerts.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{alert::Alert, html::error_view, not_found::get_404_not_found_response};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The request to the scoring API could not be sent or the connection
    /// failed before a response arrived.
    #[error("could not reach the transaction API: {0}")]
    Transport(String),

    /// The scoring API answered with a non-success status code.
    #[error("{endpoint} responded with status {status}")]
    UnexpectedStatus {
        /// The path of the endpoint that was called.
        endpoint: String,
        /// The HTTP status code in the response.
        status: u16,
    },

    /// The scoring API or push hub sent a body that could not be decoded.
    #[error("could not decode the response: {0}")]
    InvalidResponse(String),

    /// The push hub closed the connection.
    ///
    /// When `allow_reconnect` is false the hub asked the client not to come
    /// back, so no further connection attempts should be made.
    #[error("the push hub closed the connection: {reason}")]
    PushChannelClosed {
        /// The reason given by the hub, may be empty.
        reason: String,
        /// Whether the hub allows reconnecting.
        allow_reconnect: bool,
    },

    /// The multipart form could not be parsed.
    #[error("Could not parse multipart form: {0}")]
    MultipartError(String),

    /// The multipart form did not contain a CSV file.
    #[error("File is not a CSV")]
    NotCSV,

    /// The CSV had issues that prevented it from being parsed.
    #[error("Could not parse the CSV file: {0}")]
    InvalidCSV(String),

    /// A batch size of zero was requested.
    #[error("the batch size must be at least one")]
    InvalidChunkSize,

    /// A server setting could not be used, e.g. an unparseable reconnect delay.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A query string or form had a value that could not be parsed.
    #[error("invalid form value: {0}")]
    InvalidForm(String),

    /// The requested resource was not found.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// Could not acquire the lock on the dashboard state.
    #[error("could not acquire the dashboard state lock")]
    StateLockError,
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            Error::InvalidResponse(value.to_string())
        } else if let Some(status) = value.status() {
            Error::UnexpectedStatus {
                endpoint: value
                    .url()
                    .map(|url| url.path().to_owned())
                    .unwrap_or_default(),
                status: status.as_u16(),
            }
        } else {
            Error::Transport(value.to_string())
        }
    }
}

impl From<csv::Error> for Error {
    fn from(value: csv::Error) -> Self {
        Error::InvalidCSV(value.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => get_404_not_found_response(),
            Error::InvalidTimezoneError(timezone) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_view(
                    "Internal Server Error",
                    "500",
                    "Invalid Timezone Settings",
                    &format!(
                        "Could not get local timezone \"{timezone}\". Check your server settings and \
                        ensure the timezone has been set to valid, canonical timezone string"
                    ),
                ),
            )
                .into_response(),
            Error::InvalidForm(details) => (
                StatusCode::BAD_REQUEST,
                error_view("Bad Request", "400", "Invalid filter value", &details),
            )
                .into_response(),
            error @ (Error::Transport(_)
            | Error::UnexpectedStatus { .. }
            | Error::InvalidResponse(_)) => {
                tracing::error!("The transaction API could not be used: {error}");
                (
                    StatusCode::BAD_GATEWAY,
                    error_view(
                        "Bad Gateway",
                        "502",
                        "Could not load transactions",
                        "The transaction API could not be reached. Try again later.",
                    ),
                )
                    .into_response()
            }
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {error}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_view(
                        "Internal Server Error",
                        "500",
                        "Sorry, something went wrong.",
                        "Try again later or check the server logs",
                    ),
                )
                    .into_response()
            }
        }
    }
}

impl Error {
    /// Convert the error into an HTTP response with an HTML alert.
    pub fn into_alert_response(self) -> Response {
        let (status_code, alert) = match self {
            Error::NotCSV => (
                StatusCode::BAD_REQUEST,
                Alert::ErrorSimple {
                    message: "File type must be CSV.".to_owned(),
                },
            ),
            Error::InvalidCSV(details) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Failed to parse CSV".to_owned(),
                    details,
                },
            ),
            Error::MultipartError(details) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Could not read the uploaded file".to_owned(),
                    details,
                },
            ),
            Error::InvalidForm(details) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Invalid form".to_owned(),
                    details,
                },
            ),
            Error::Transport(_) | Error::UnexpectedStatus { .. } | Error::InvalidResponse(_) => (
                StatusCode::BAD_GATEWAY,
                Alert::Error {
                    message: "Failed to reach the transaction API".to_owned(),
                    details: "The previous data is still shown. Try again later.".to_owned(),
                },
            ),
            Error::InvalidTimezoneError(timezone) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Alert::Error {
                    message: "Invalid Timezone Settings".to_owned(),
                    details: format!(
                        "Could not get local timezone \"{timezone}\". Check your server settings and \
                        ensure the timezone has been set to valid, canonical timezone string"
                    ),
                },
            ),
            error => {
                tracing::error!("An unexpected error occurred: {error}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Alert::Error {
                        message: "Something went wrong".to_owned(),
                        details: "An unexpected error occurred, check the server logs for more details."
                            .to_owned(),
                    },
                )
            }
        };

        (status_code, alert.into_html()).into_response()
    }
}
