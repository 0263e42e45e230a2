use axum::{
    Extension,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};

use crate::{
    AppState,
    alert::Alert,
    api::ApiClient,
    auth::Session,
    transaction::{TransactionCache, TransactionId},
};

/// The state needed to delete a transaction.
#[derive(Debug, Clone)]
pub struct DeleteTransactionState {
    api: ApiClient,
    transaction_cache: TransactionCache,
}

impl FromRef<AppState> for DeleteTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            api: state.api.clone(),
            transaction_cache: state.transaction_cache.clone(),
        }
    }
}

/// A route handler for deleting a transaction.
///
/// Responds with 200 OK and a success alert, which htmx swaps out-of-band
/// while removing the table row, or an error alert.
pub async fn delete_transaction_endpoint(
    State(state): State<DeleteTransactionState>,
    Extension(session): Extension<Session>,
    Path(transaction_id): Path<TransactionId>,
) -> Response {
    if let Err(error) = state
        .api
        .delete_transaction(&session.token, &transaction_id)
        .await
    {
        tracing::error!("Could not delete transaction {transaction_id}: {error}");
        return error.into_alert_response();
    }

    match state
        .transaction_cache
        .remove(&session.token, &transaction_id)
    {
        Ok(removed) => {
            tracing::info!("Deleted transaction {transaction_id} (cached: {removed})");
        }
        Err(error) => {
            tracing::error!("Could not remove transaction {transaction_id} from the cache: {error}");
            return error.into_alert_response();
        }
    }

    // The status code has to be 200 OK or HTMX will not delete the table row.
    Alert::Success {
        message: "Transaction deleted".to_owned(),
        details: String::new(),
    }
    .into_response()
}
