//! Defines the endpoint for creating a new transaction.

use axum::{
    Extension,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
// Must use axum_extra's Form since that parses an empty string as None instead
// of crashing like axum::Form.
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use time::OffsetDateTime;

use crate::{
    AppState,
    api::ApiClient,
    auth::Session,
    endpoints,
    transaction::{TransactionCache, form::TransactionForm},
};

/// The state needed to create a transaction.
#[derive(Debug, Clone)]
pub struct CreateTransactionState {
    /// The client for sending the new transaction to the API.
    pub api: ApiClient,
    /// The per-session transaction lists.
    pub transaction_cache: TransactionCache,
}

impl FromRef<AppState> for CreateTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            api: state.api.clone(),
            transaction_cache: state.transaction_cache.clone(),
        }
    }
}

/// A route handler for creating a new transaction, redirects to the dashboard on success.
///
/// The new transaction is put at the front of the session's cached list. If
/// the API does not send back the stored record, a local one with a
/// time-based ID stands in until the next refresh.
pub async fn create_transaction_endpoint(
    State(state): State<CreateTransactionState>,
    Extension(session): Extension<Session>,
    Form(form): Form<TransactionForm>,
) -> Response {
    let new_transaction = match form.into_new_transaction() {
        Ok(new_transaction) => new_transaction,
        Err(error) => {
            tracing::warn!("Rejected transaction form: {error}");
            return error.into_alert_response();
        }
    };

    let server_record = match state
        .api
        .create_transaction(&session.token, &new_transaction)
        .await
    {
        Ok(record) => record,
        Err(error) => {
            tracing::error!("Could not create transaction: {error}");
            return error.into_alert_response();
        }
    };

    let cache = &state.transaction_cache;
    let prepended = match server_record {
        Some(record) => {
            let id = record.id.clone();
            cache.prepend(&session.token, record).map(|()| id)
        }
        None => {
            tracing::debug!("API did not return the new transaction, using a local copy");
            cache.prepend_optimistic(&session.token, new_transaction, OffsetDateTime::now_utc())
        }
    };

    match prepended {
        Ok(id) => tracing::info!("Created transaction {id}"),
        Err(error) => {
            tracing::error!("Could not add the new transaction to the cache: {error}");
            return error.into_alert_response();
        }
    }

    (
        HxRedirect(endpoints::DASHBOARD_VIEW.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}
