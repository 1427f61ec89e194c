//! Alert messages shown to the user after an action succeeds or fails.
//!
//! Alerts are rendered as HTML fragments that HTMX swaps into the alert
//! container defined in [crate::html::base].

use axum::response::{IntoResponse, Response};
use maud::{Markup, html};

/// A success or error message with optional details.
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    Success { message: String, details: String },
    SuccessSimple { message: String },
    Error { message: String, details: String },
    ErrorSimple { message: String },
}

impl Alert {
    /// Render the alert as a dismissible box.
    pub fn into_html(self) -> Markup {
        let (is_error, message, details) = match self {
            Alert::Success { message, details } => (false, message, details),
            Alert::SuccessSimple { message } => (false, message, String::new()),
            Alert::Error { message, details } => (true, message, details),
            Alert::ErrorSimple { message } => (true, message, String::new()),
        };

        let style = if is_error {
            "p-4 mb-4 rounded-lg border text-red-800 border-red-300 bg-red-50 \
            dark:bg-gray-800 dark:text-red-400 dark:border-red-800"
        } else {
            "p-4 mb-4 rounded-lg border text-green-800 border-green-300 bg-green-50 \
            dark:bg-gray-800 dark:text-green-400 dark:border-green-800"
        };

        html! {
            div
                role="alert"
                class=(style)
                data-alert-kind=(if is_error { "error" } else { "success" })
            {
                div class="flex items-center justify-between gap-4"
                {
                    h3 class="text-lg font-medium" { (message) }

                    button
                        type="button"
                        class="bg-transparent border-none cursor-pointer"
                        aria-label="Dismiss"
                        onclick="this.closest('[role=alert]').remove()"
                    {
                        "×"
                    }
                }

                @if !details.is_empty() {
                    p class="mt-2 text-sm" { (details) }
                }
            }
        }
    }
}

impl IntoResponse for Alert {
    fn into_response(self) -> Response {
        self.into_html().into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::Alert;

    #[test]
    fn error_alert_includes_details() {
        let html = Alert::Error {
            message: "Import failed".to_owned(),
            details: "line 3".to_owned(),
        }
        .into_html()
        .into_string();

        assert!(html.contains("data-alert-kind=\"error\""));
        assert!(html.contains("Import failed"));
        assert!(html.contains("line 3"));
    }

    #[test]
    fn simple_success_alert_omits_details() {
        let html = Alert::SuccessSimple {
            message: "Done".to_owned(),
        }
        .into_html()
        .into_string();

        assert!(html.contains("data-alert-kind=\"success\""));
        assert!(!html.contains("<p"));
    }
}
