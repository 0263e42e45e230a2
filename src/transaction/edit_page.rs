//! Defines the route handler for the page for editing a transaction.

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};

use crate::{
    AppState, Error,
    api::ApiClient,
    auth::Session,
    endpoints::{self, format_endpoint},
    html::{BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, base, link, loading_spinner},
    navigation::NavBar,
    transaction::{
        Transaction, TransactionCache, TransactionId,
        form::{TransactionFormDefaults, transaction_form_fields},
        load_transactions,
    },
};

fn edit_transaction_view(nav_bar: Markup, transaction: &Transaction) -> Markup {
    let update_route = format_endpoint(endpoints::TRANSACTION, &transaction.id);
    let fields = transaction_form_fields(&TransactionFormDefaults {
        name: Some(&transaction.name),
        amount: Some(transaction.amount),
        date: transaction.date,
        description: transaction.description.as_deref(),
    });
    let spinner = loading_spinner();

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            form
                hx-put=(update_route)
                hx-target-error="#alert-container"
                hx-indicator="#indicator"
                class="w-full max-w-md space-y-4 md:space-y-6"
            {
                h2 class="text-xl font-bold" { "Edit Transaction" }

                (fields)

                button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
                {
                    span
                        id="indicator"
                        class="inline htmx-indicator"
                    {
                        (spinner)
                    }
                    " Update Transaction"
                }

                p class="text-sm text-center"
                {
                    (link(endpoints::DASHBOARD_VIEW, "Back to dashboard"))
                }
            }
        }
    };

    base("Edit Transaction", &content)
}

/// The state needed for the edit transaction page.
#[derive(Debug, Clone)]
pub struct EditTransactionPageState {
    /// The client for fetching the transaction list on a cache miss.
    pub api: ApiClient,
    /// The per-session transaction lists.
    pub transaction_cache: TransactionCache,
}

impl FromRef<AppState> for EditTransactionPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            api: state.api.clone(),
            transaction_cache: state.transaction_cache.clone(),
        }
    }
}

/// Renders the page for editing a transaction, prefilled with its current values.
///
/// The transaction is looked up in the session's list, so an ID that is not
/// in that list is a 404.
pub async fn get_edit_transaction_page(
    State(state): State<EditTransactionPageState>,
    Extension(session): Extension<Session>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<Response, Error> {
    let transactions = load_transactions(
        &state.api,
        &state.transaction_cache,
        &session.token,
        false,
    )
    .await?;

    let Some(transaction) = transactions
        .iter()
        .find(|transaction| transaction.id == transaction_id)
    else {
        tracing::warn!("Transaction {transaction_id} is not in the session's list");
        return Err(Error::NotFound);
    };

    let nav_bar = NavBar::new(endpoints::EDIT_TRANSACTION_VIEW, &session.user).into_html();

    Ok(edit_transaction_view(nav_bar, transaction).into_response())
}
