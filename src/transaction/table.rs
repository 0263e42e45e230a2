//! The transaction table shown on the dashboard and the fragment endpoint the
//! filter form swaps it with.

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    response::{Html, IntoResponse, Response},
};
use maud::{Markup, html};

use crate::{
    AppState,
    api::ApiClient,
    auth::Session,
    endpoints::{self, format_endpoint},
    html::{
        BUTTON_DELETE_STYLE, LINK_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE,
        format_rupiah,
    },
    transaction::{
        FilterQuery, Transaction, TransactionCache, TransactionFilter, filter_transactions,
        load_transactions,
    },
};

/// The ID of the element the filter form replaces.
pub const TRANSACTIONS_TABLE_ID: &str = "transactions-table";

fn transaction_row(transaction: &Transaction) -> Markup {
    let edit_url = format_endpoint(endpoints::EDIT_TRANSACTION_VIEW, &transaction.id);
    let delete_url = format_endpoint(endpoints::TRANSACTION, &transaction.id);
    let amount_style = if transaction.amount < 0.0 {
        "text-red-600 dark:text-red-400"
    } else {
        "text-green-600 dark:text-green-400"
    };

    html! {
        tr class=(TABLE_ROW_STYLE) data-transaction-id=(transaction.id)
        {
            th
                scope="row"
                class="px-6 py-4 font-medium text-gray-900 whitespace-nowrap dark:text-white"
            {
                (transaction.name)
            }

            td class=(TABLE_CELL_STYLE) { (transaction.date) }

            td class={ (TABLE_CELL_STYLE) " text-right whitespace-nowrap " (amount_style) }
            {
                (format_rupiah(transaction.amount))
            }

            td class=(TABLE_CELL_STYLE)
            {
                @if let Some(description) = &transaction.description {
                    (description)
                }
            }

            td class=(TABLE_CELL_STYLE)
            {
                div class="flex gap-4"
                {
                    a href=(edit_url) class=(LINK_STYLE) { "Edit" }

                    button
                        hx-delete=(delete_url)
                        hx-confirm={ "Are you sure you want to delete '" (transaction.name) "'?" }
                        hx-target="closest tr"
                        hx-target-error="#alert-container"
                        hx-swap="delete"
                        class=(BUTTON_DELETE_STYLE)
                    {
                        "Delete"
                    }
                }
            }
        }
    }
}

/// The table of `transactions`, wrapped in the element the filter form targets.
pub fn transactions_table(transactions: &[&Transaction]) -> Markup {
    html! {
        div id=(TRANSACTIONS_TABLE_ID) class="relative overflow-x-auto shadow-md sm:rounded-lg"
        {
            table class="w-full text-sm text-left rtl:text-right text-gray-500 dark:text-gray-400"
            {
                thead class=(TABLE_HEADER_STYLE)
                {
                    tr
                    {
                        th scope="col" class=(TABLE_CELL_STYLE) { "Name" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                        th scope="col" class={ (TABLE_CELL_STYLE) " text-right" } { "Amount" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Description" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                    }
                }

                tbody
                {
                    @for transaction in transactions {
                        (transaction_row(transaction))
                    }

                    @if transactions.is_empty() {
                        tr class=(TABLE_ROW_STYLE)
                        {
                            td
                                colspan="5"
                                class="px-6 py-4 text-center"
                            {
                                "No transactions found"
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Shown in place of the table when the list could not be loaded.
pub fn transactions_table_error(message: &str) -> Markup {
    html! {
        div id=(TRANSACTIONS_TABLE_ID) role="alert"
            class="p-4 text-sm text-red-800 rounded-lg bg-red-50 dark:bg-gray-800 dark:text-red-400"
        {
            p class="font-semibold" { "Could not load transactions" }
            p { (message) }
        }
    }
}

/// The filter inputs above the table. Changing either input reloads the table.
pub fn filter_form(filter: &TransactionFilter) -> Markup {
    let name = filter.name.as_deref().unwrap_or_default();

    html! {
        form
            hx-get=(endpoints::TRANSACTIONS_TABLE)
            hx-target={ "#" (TRANSACTIONS_TABLE_ID) }
            hx-target-error="#alert-container"
            hx-swap="outerHTML"
            hx-trigger="input changed delay:300ms from:input[name='name'], change from:input[name='date'], submit"
            class="flex flex-wrap items-end gap-4 mb-4"
        {
            div
            {
                label for="filter-date" class="block mb-1 text-sm font-medium" { "Date" }
                input
                    id="filter-date"
                    name="date"
                    type="date"
                    value=[filter.date]
                    class="p-2 rounded text-sm bg-gray-50 border border-gray-300 dark:bg-gray-700 dark:border-gray-600";
            }

            div
            {
                label for="filter-name" class="block mb-1 text-sm font-medium" { "Name" }
                input
                    id="filter-name"
                    name="name"
                    type="search"
                    placeholder="Search by name"
                    value=(name)
                    class="p-2 rounded text-sm bg-gray-50 border border-gray-300 dark:bg-gray-700 dark:border-gray-600";
            }

            a href=(endpoints::DASHBOARD_VIEW) class=(LINK_STYLE) { "Reset" }
        }
    }
}

/// The state needed to render the transaction table.
#[derive(Debug, Clone)]
pub struct TransactionTableState {
    /// The client for fetching the transaction list.
    pub api: ApiClient,
    /// The per-session transaction lists.
    pub transaction_cache: TransactionCache,
}

impl FromRef<AppState> for TransactionTableState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            api: state.api.clone(),
            transaction_cache: state.transaction_cache.clone(),
        }
    }
}

/// Renders the table filtered by the query string, for swapping into the dashboard.
pub async fn get_transactions_table(
    State(state): State<TransactionTableState>,
    Extension(session): Extension<Session>,
    Query(query): Query<FilterQuery>,
) -> Response {
    let filter = TransactionFilter::from(query);

    let transactions = match load_transactions(
        &state.api,
        &state.transaction_cache,
        &session.token,
        false,
    )
    .await
    {
        Ok(transactions) => transactions,
        Err(error) => {
            tracing::error!("Could not load transactions: {error}");
            return error.into_alert_response();
        }
    };

    let visible = filter_transactions(&transactions, &filter);
    tracing::debug!(
        "Showing {} of {} transactions for {filter:?}",
        visible.len(),
        transactions.len()
    );

    Html(transactions_table(&visible).into_string()).into_response()
}
