//! Defines the route handler for the page for creating a new transaction.

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use time::Date;

use crate::{
    AppState, Error,
    auth::Session,
    endpoints,
    html::{BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, base, link, loading_spinner},
    navigation::NavBar,
    timezone::local_today,
    transaction::form::{TransactionFormDefaults, transaction_form_fields},
};

fn create_transaction_view(nav_bar: Markup, today: Date) -> Markup {
    let fields = transaction_form_fields(&TransactionFormDefaults {
        name: None,
        amount: None,
        date: today,
        description: None,
    });
    let spinner = loading_spinner();

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            form
                hx-post=(endpoints::TRANSACTIONS_API)
                hx-target-error="#alert-container"
                hx-indicator="#indicator"
                class="w-full max-w-md space-y-4 md:space-y-6"
            {
                h2 class="text-xl font-bold" { "New Transaction" }

                (fields)

                button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
                {
                    span
                        id="indicator"
                        class="inline htmx-indicator"
                    {
                        (spinner)
                    }
                    " Create Transaction"
                }

                p class="text-sm text-center"
                {
                    (link(endpoints::DASHBOARD_VIEW, "Back to dashboard"))
                }
            }
        }
    };

    base("Create Transaction", &content)
}

/// The state needed for create new transaction page.
#[derive(Debug, Clone)]
pub struct CreateTransactionPageState {
    /// The local timezone as a canonical timezone name, e.g. "Asia/Jakarta".
    pub local_timezone: String,
}

impl FromRef<AppState> for CreateTransactionPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Renders the page for creating a transaction. The date defaults to today.
pub async fn get_create_transaction_page(
    State(state): State<CreateTransactionPageState>,
    Extension(session): Extension<Session>,
) -> Result<Response, Error> {
    let today = local_today(&state.local_timezone)?;
    let nav_bar = NavBar::new(endpoints::NEW_TRANSACTION_VIEW, &session.user).into_html();

    Ok(create_transaction_view(nav_bar, today).into_response())
}
