//! Daybook is a small web dashboard for recording and reviewing transactions.
//!
//! This library serves HTML pages directly and acts as a thin client over a
//! remote REST API which owns all persistence. Administrators can create,
//! edit, delete and filter transactions; guests only see today's total.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use tokio::signal;

mod alert;
mod api;
mod app_state;
mod auth;
mod dashboard;
mod endpoints;
mod html;
mod internal_server_error;
mod logging;
mod navigation;
mod not_found;
mod routing;
mod timezone;
mod transaction;

#[cfg(test)]
mod test_utils;

pub use api::ApiClient;
pub use app_state::AppState;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use routing::build_router;
pub use timezone::get_local_offset;

use crate::{
    alert::Alert, auth::SessionRejected, internal_server_error::InternalServerError,
    not_found::get_404_not_found_response,
};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {error}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                tracing::error!("failed to install signal handler: {error}");
                std::future::pending::<()>().await;
            }
        }
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

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The remote API rejected the email and password.
    ///
    /// Holds the message from the server, or a fixed fallback message.
    #[error("{0}")]
    InvalidCredentials(String),

    /// The remote API answered an authenticated request with 401.
    ///
    /// The session token is no longer valid and the user must log in again.
    #[error("the session token was rejected by the API")]
    Unauthorized,

    /// A guest tried to use a route that is reserved for administrators.
    #[error("this action requires the super_admin role")]
    Forbidden,

    /// The remote API answered with a non-2xx status.
    ///
    /// Holds the message from the server, or a fixed fallback message.
    #[error("{0}")]
    ApiRequestFailed(String),

    /// The configured API base URL is not a valid absolute URL.
    #[error("invalid API URL \"{0}\"")]
    InvalidApiUrl(String),

    /// The request never produced an HTTP response, e.g. the API is down.
    #[error("could not reach the API: {0}")]
    ApiUnreachable(String),

    /// The API answered with a body that could not be decoded.
    #[error("the API sent an unexpected response: {0}")]
    InvalidApiResponse(String),

    /// The session cookies are missing from the cookie jar in the request.
    #[error("no session cookies in the cookie jar")]
    CookieMissing,

    /// The session cookies were present but their contents could not be parsed.
    #[error("invalid session cookie: {0}")]
    InvalidSessionCookie(String),

    /// The requested resource was not found.
    ///
    /// For transactions, this means the ID is not in the list displayed to
    /// the user.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// Could not acquire the lock on the transaction cache.
    #[error("could not acquire the transaction cache lock")]
    CacheLockError,

    /// A transaction name was empty or only whitespace.
    #[error("transaction name cannot be empty")]
    EmptyTransactionName,

    /// The amount entered in a form had no digits or was too large to store exactly.
    #[error("\"{0}\" is not a valid amount")]
    InvalidAmount(String),

    /// An error occurred while serializing a struct as JSON.
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            Error::InvalidApiResponse(value.to_string())
        } else {
            Error::ApiUnreachable(value.to_string())
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => get_404_not_found_response(),
            Error::Unauthorized => session_rejected_response(),
            Error::Forbidden => InternalServerError {
                description: "Access denied",
                fix: "Only administrators can manage transactions.",
            }
            .into_response_with_status(StatusCode::FORBIDDEN),
            Error::InvalidTimezoneError(timezone) => InternalServerError {
                description: "Invalid Timezone Settings",
                fix: &format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            }
            .into_response(),
            Error::ApiUnreachable(error) => {
                tracing::error!("The API could not be reached: {error}");
                InternalServerError {
                    description: "Could not reach the server",
                    fix: "The transaction service is unavailable. Try again later.",
                }
                .into_response_with_status(StatusCode::BAD_GATEWAY)
            }
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                InternalServerError::default().into_response()
            }
        }
    }
}

impl Error {
    fn into_alert_response(self) -> Response {
        match self {
            Error::Unauthorized => session_rejected_response(),
            Error::Forbidden => Alert::Error {
                message: "Access denied".to_owned(),
                details: "Only administrators can manage transactions.".to_owned(),
            }
            .into_response_with_status(StatusCode::FORBIDDEN),
            Error::NotFound => Alert::Error {
                message: "Transaction not found".to_owned(),
                details: "Try refreshing the page to see if the transaction has already been \
                    deleted."
                    .to_owned(),
            }
            .into_response_with_status(StatusCode::NOT_FOUND),
            Error::EmptyTransactionName => Alert::Error {
                message: "Invalid transaction name".to_owned(),
                details: "Enter a name for the transaction.".to_owned(),
            }
            .into_response_with_status(StatusCode::BAD_REQUEST),
            Error::InvalidAmount(amount) => Alert::Error {
                message: "Invalid amount".to_owned(),
                details: format!("\"{amount}\" is not a valid amount. Enter an amount such as 25.000."),
            }
            .into_response_with_status(StatusCode::BAD_REQUEST),
            Error::ApiRequestFailed(message) => Alert::Error {
                message: "Request failed".to_owned(),
                details: message,
            }
            .into_response_with_status(StatusCode::BAD_GATEWAY),
            Error::ApiUnreachable(_) => Alert::Error {
                message: "Could not reach the server".to_owned(),
                details: "The transaction service is unavailable. Try again later.".to_owned(),
            }
            .into_response_with_status(StatusCode::BAD_GATEWAY),
            _ => Alert::Error {
                message: "Something went wrong".to_owned(),
                details: "An unexpected error occurred, check the server logs for more details."
                    .to_owned(),
            }
            .into_response_with_status(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }
}

/// A 401 response tagged with [SessionRejected] so that the auth middleware
/// clears the session and sends the client to the log-in page.
fn session_rejected_response() -> Response {
    let mut response = StatusCode::UNAUTHORIZED.into_response();
    response.extensions_mut().insert(SessionRejected);
    response
}
