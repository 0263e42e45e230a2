//! Defines the endpoint for updating a transaction.

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use time::OffsetDateTime;

use crate::{
    AppState,
    api::ApiClient,
    auth::Session,
    endpoints,
    transaction::{TransactionCache, TransactionId, form::TransactionForm},
};

/// The state needed to edit a transaction.
#[derive(Debug, Clone)]
pub struct EditTransactionState {
    /// The client for sending the update to the API.
    pub api: ApiClient,
    /// The per-session transaction lists.
    pub transaction_cache: TransactionCache,
}

impl FromRef<AppState> for EditTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            api: state.api.clone(),
            transaction_cache: state.transaction_cache.clone(),
        }
    }
}

/// A route handler for updating a transaction, redirects to the dashboard on success.
pub async fn edit_transaction_endpoint(
    State(state): State<EditTransactionState>,
    Extension(session): Extension<Session>,
    Path(transaction_id): Path<TransactionId>,
    Form(form): Form<TransactionForm>,
) -> Response {
    let patch = match form.into_patch() {
        Ok(patch) => patch,
        Err(error) => {
            tracing::warn!("Rejected transaction form: {error}");
            return error.into_alert_response();
        }
    };

    let server_record = match state
        .api
        .update_transaction(&session.token, &transaction_id, &patch)
        .await
    {
        Ok(record) => record,
        Err(error) => {
            tracing::error!("Could not update transaction {transaction_id}: {error}");
            return error.into_alert_response();
        }
    };

    match state.transaction_cache.update(
        &session.token,
        &transaction_id,
        &patch,
        server_record,
        OffsetDateTime::now_utc(),
    ) {
        Ok(true) => tracing::info!("Updated transaction {transaction_id}"),
        Ok(false) => {
            tracing::debug!("Transaction {transaction_id} was not cached, skipping cache update")
        }
        Err(error) => {
            tracing::error!("Could not update the cached transaction: {error}");
            return error.into_alert_response();
        }
    }

    (
        HxRedirect(endpoints::DASHBOARD_VIEW.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}
