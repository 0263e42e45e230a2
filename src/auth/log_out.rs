//! Log-out route handler that clears the session and redirects users.

use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::PrivateCookieJar;

use crate::{
    auth::cookie::{get_session_from_cookies, invalidate_session_cookies},
    endpoints,
    transaction::TransactionCache,
};

/// Forget the session's cached transactions, invalidate the session cookies
/// and redirect the client to the log-in page.
pub async fn get_log_out(
    State(transaction_cache): State<TransactionCache>,
    jar: PrivateCookieJar,
) -> Response {
    if let Ok(session) = get_session_from_cookies(&jar) {
        tracing::info!("User {} logged out", session.user.id);

        if let Err(error) = transaction_cache.evict(&session.token) {
            tracing::error!("Could not evict cached transactions: {error}");
        }
    }

    let jar = invalidate_session_cookies(jar);

    (jar, Redirect::to(endpoints::LOG_IN_VIEW)).into_response()
}
