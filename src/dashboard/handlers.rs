//! Dashboard HTTP handler and view rendering.

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use serde::Deserialize;

use crate::{
    AppState, Error,
    api::ApiClient,
    auth::Session,
    dashboard::cards::{limited_access_notice, today_total_card, welcome_header},
    endpoints,
    html::{BUTTON_PRIMARY_STYLE, PAGE_CONTAINER_STYLE, base},
    navigation::NavBar,
    transaction::{
        FilterQuery, TransactionCache, TransactionFilter, filter_form, filter_transactions,
        load_transactions, transactions_table, transactions_table_error,
    },
};

/// The state needed for displaying the dashboard page.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The client for fetching today's total and the transaction list.
    pub api: ApiClient,
    /// The per-session transaction lists.
    pub transaction_cache: TransactionCache,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            api: state.api.clone(),
            transaction_cache: state.transaction_cache.clone(),
        }
    }
}

/// The dashboard's query string.
///
/// `refresh=true` refetches the transaction list; `date` and `name` set the
/// initial filter.
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    refresh: Option<String>,
    date: Option<String>,
    name: Option<String>,
}

impl DashboardQuery {
    fn wants_refresh(&self) -> bool {
        matches!(self.refresh.as_deref(), Some("true" | "1"))
    }
}

/// Display the dashboard for the logged-in user.
///
/// A failed total request shows zero. A failed list request shows an error
/// in place of the table. A rejected token ends the session either way.
pub async fn get_dashboard_page(
    State(state): State<DashboardState>,
    Extension(session): Extension<Session>,
    Query(query): Query<DashboardQuery>,
) -> Result<Response, Error> {
    let today_total = match state.api.today_total(&session.token).await {
        Ok(total) => total,
        Err(Error::Unauthorized) => return Err(Error::Unauthorized),
        Err(error) => {
            tracing::error!("Could not get today's total: {error}");
            0.0
        }
    };

    let management = if session.user.is_admin() {
        let refresh = query.wants_refresh();
        let filter = TransactionFilter::from(FilterQuery {
            date: query.date,
            name: query.name,
        });

        Some(
            transaction_management_view(&state, &session.token, &filter, refresh).await?,
        )
    } else {
        None
    };

    let nav_bar = NavBar::new(endpoints::DASHBOARD_VIEW, &session.user).into_html();

    let content = html! {
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-screen-xl"
            {
                (welcome_header(&session.user))
                (today_total_card(today_total))

                @match management {
                    Some(management) => (management),
                    None => (limited_access_notice()),
                }
            }
        }
    };

    Ok(base("Dashboard", &content).into_response())
}

async fn transaction_management_view(
    state: &DashboardState,
    token: &str,
    filter: &TransactionFilter,
    refresh: bool,
) -> Result<Markup, Error> {
    let table = match load_transactions(&state.api, &state.transaction_cache, token, refresh).await
    {
        Ok(transactions) => transactions_table(&filter_transactions(&transactions, filter)),
        Err(Error::Unauthorized) => return Err(Error::Unauthorized),
        Err(error) => {
            tracing::error!("Could not load transactions: {error}");
            transactions_table_error(&error.to_string())
        }
    };

    Ok(html! {
        section id="manage-transactions" class="w-full"
        {
            div class="flex justify-between items-center mb-4"
            {
                h2 class="text-xl font-semibold" { "Manage transactions" }

                a
                    href=(endpoints::NEW_TRANSACTION_VIEW)
                    class={ (BUTTON_PRIMARY_STYLE) " max-w-48 text-center" }
                {
                    "Add transaction"
                }
            }

            (filter_form(filter))
            (table)
        }
    })
}
