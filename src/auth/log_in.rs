//! This file defines the routes for displaying the log-in page and handling log-in requests.
//! The API checks the credentials; this module stores the resulting session in cookies.

use axum::{
    extract::{FromRef, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{Form, PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::{
    ApiClient, AppState, Error,
    api::Credentials,
    auth::{
        Session,
        cookie::{get_session_from_cookies, invalidate_session_cookies, set_session_cookies},
        redirect::parse_redirect_url,
    },
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base, loading_spinner,
        log_in_card,
    },
    transaction::TransactionCache,
};

fn log_in_form(email: &str, error_message: Option<&str>, redirect_url: Option<&str>) -> Markup {
    html! {
        form
            hx-post=(endpoints::LOG_IN_API)
            hx-swap="outerHTML"
            hx-indicator="#indicator"
            hx-disabled-elt="#email, #password, #submit-button"
            class="space-y-4 md:space-y-6"
        {
            @if let Some(redirect_url) = redirect_url {
                input type="hidden" name="redirect_url" value=(redirect_url);
            }

            div
            {
                label for="email" class=(FORM_LABEL_STYLE) { "Email" }

                input
                    type="email"
                    name="email"
                    id="email"
                    placeholder="name@example.com"
                    class=(FORM_TEXT_INPUT_STYLE)
                    required
                    autofocus[email.is_empty()]
                    value=(email);
            }

            div
            {
                label for="password" class=(FORM_LABEL_STYLE) { "Password" }

                input
                    type="password"
                    name="password"
                    id="password"
                    placeholder="••••••••"
                    class=(FORM_TEXT_INPUT_STYLE)
                    required
                    autofocus[!email.is_empty()];

                @if let Some(error_message) = error_message
                {
                    p class="text-red-500 text-base" { (error_message) }
                }
            }

            button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Log in"
            }
        }
    }
}

#[derive(Deserialize)]
pub struct RedirectQuery {
    pub redirect_url: Option<String>,
}

/// Display the log-in page, or go straight to the dashboard if already logged in.
pub async fn get_log_in_page(jar: PrivateCookieJar, Query(query): Query<RedirectQuery>) -> Response {
    let redirect_url = parse_redirect_url(query.redirect_url.as_deref(), "log-in query");

    if get_session_from_cookies(&jar).is_ok() {
        let target = redirect_url.as_deref().unwrap_or(endpoints::DASHBOARD_VIEW);
        return Redirect::to(target).into_response();
    }

    let log_in_form = log_in_form("", None, redirect_url.as_deref());
    let content = log_in_card("Log in to your account", &log_in_form);
    base("Log In", &content).into_response()
}

/// The state needed to perform a login.
#[derive(Debug, Clone)]
pub struct LogInState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which the session cookies are valid.
    pub cookie_duration: Duration,
    /// The API that checks the credentials.
    pub api: ApiClient,
    /// Cleared for the new token so the dashboard starts from a fresh fetch.
    pub transaction_cache: TransactionCache,
}

impl FromRef<AppState> for LogInState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            api: state.api.clone(),
            transaction_cache: state.transaction_cache.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<LogInState> for Key {
    fn from_ref(state: &LogInState) -> Self {
        state.cookie_key.clone()
    }
}

/// Shown when the API cannot be reached or answers with something unexpected.
pub const LOG_IN_UNAVAILABLE_ERROR_MSG: &str =
    "Could not log in right now. Please try again later.";

/// Handler for log-in requests via the POST method.
///
/// On a successful log-in request, the session cookies are set and the client is redirected to the dashboard page.
/// Otherwise, the form is returned with an error message explaining the problem.
pub async fn post_log_in(
    State(state): State<LogInState>,
    jar: PrivateCookieJar,
    Form(user_data): Form<LogInData>,
) -> Response {
    let redirect_url = parse_redirect_url(user_data.redirect_url.as_deref(), "log-in form");
    let redirect_url = redirect_url.as_deref();
    let credentials = Credentials {
        email: user_data.email.trim().to_owned(),
        password: user_data.password,
    };

    let log_in_response = match state.api.log_in(&credentials).await {
        Ok(log_in_response) => log_in_response,
        Err(Error::InvalidCredentials(message)) => {
            tracing::info!("Log-in rejected for {}: {message}", credentials.email);
            return log_in_form(&credentials.email, Some(&message), redirect_url).into_response();
        }
        Err(error) => {
            tracing::error!("Unhandled error while logging in: {error}");
            return log_in_form(
                &credentials.email,
                Some(LOG_IN_UNAVAILABLE_ERROR_MSG),
                redirect_url,
            )
            .into_response();
        }
    };

    let session = Session {
        token: log_in_response.token,
        user: log_in_response.user,
    };
    tracing::info!("User {} logged in as {}", session.user.id, session.user.role);

    if let Err(error) = state.transaction_cache.evict(&session.token) {
        tracing::error!("Could not clear cached transactions: {error}");
    }

    let redirect_url = redirect_url.unwrap_or(endpoints::DASHBOARD_VIEW);

    set_session_cookies(jar.clone(), &session, state.cookie_duration)
        .map(|updated_jar| {
            (
                StatusCode::SEE_OTHER,
                HxRedirect(redirect_url.to_owned()),
                updated_jar,
            )
        })
        .map_err(|err| {
            tracing::error!("Error setting session cookies: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                HxRedirect(endpoints::INTERNAL_ERROR_VIEW.to_owned()),
                invalidate_session_cookies(jar),
            )
        })
        .into_response()
}

/// The raw data entered by the user in the log-in form.
#[derive(Clone, Serialize, Deserialize)]
pub struct LogInData {
    /// Email entered during log-in.
    pub email: String,

    /// Password entered during log-in. Checked by the API, never stored.
    pub password: String,

    /// Optional URL to redirect to after logging in.
    /// Only accepted from the log-in form submission.
    pub redirect_url: Option<String>,
}


#[cfg(test)]
mod log_in_tests {
    use axum::{
        body::Body,
        extract::{FromRef, State},
        http::Response,
    };
    use axum_extra::extract::{Form, PrivateCookieJar};
    use scraper::Selector;

    use crate::{
        ApiClient, AppState,
        auth::{
            Role,
            cookie::{COOKIE_TOKEN, COOKIE_USER, get_session_from_cookies},
        },
        endpoints,
        test_utils::{
            StubApi, StubOptions, assert_hx_redirect, assert_valid_html, jar_from_response,
            must_get_form, parse_html_fragment,
            stub_api::{ADMIN_EMAIL, ADMIN_TOKEN, GUEST_EMAIL, GUEST_TOKEN, PASSWORD},
        },
        transaction::Transaction,
    };

    use super::{LOG_IN_UNAVAILABLE_ERROR_MSG, LogInData, LogInState, post_log_in};

    async fn get_state() -> (LogInState, StubApi) {
        let api = StubApi::start(StubOptions::default()).await;
        let state = AppState::new("foobar", "Etc/UTC", ApiClient::new(&api.base_url).unwrap());

        (LogInState::from_ref(&state), api)
    }

    async fn new_log_in_request(state: LogInState, log_in_form: LogInData) -> Response<Body> {
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        post_log_in(State(state), jar, Form(log_in_form)).await
    }

    fn cookie_names(response: &Response<Body>) -> Vec<String> {
        response
            .headers()
            .get_all("set-cookie")
            .iter()
            .filter_map(|header| header.to_str().ok())
            .filter_map(|header| header.split_once('=').map(|(name, _)| name.to_owned()))
            .collect()
    }

    #[tokio::test]
    async fn log_in_succeeds_with_valid_credentials() {
        let (state, _api) = get_state().await;

        let response = new_log_in_request(
            state,
            LogInData {
                email: ADMIN_EMAIL.to_owned(),
                password: PASSWORD.to_owned(),
                redirect_url: None,
            },
        )
        .await;

        assert_hx_redirect(&response, endpoints::DASHBOARD_VIEW);
        let names = cookie_names(&response);
        assert!(names.contains(&COOKIE_TOKEN.to_owned()), "got cookies {names:?}");
        assert!(names.contains(&COOKIE_USER.to_owned()), "got cookies {names:?}");
    }

    #[tokio::test]
    async fn log_in_stores_session_for_guest() {
        let (state, _api) = get_state().await;
        let cookie_key = state.cookie_key.clone();

        let response = new_log_in_request(
            state,
            LogInData {
                email: GUEST_EMAIL.to_owned(),
                password: PASSWORD.to_owned(),
                redirect_url: None,
            },
        )
        .await;

        let jar = jar_from_response(&response, cookie_key);
        let session = get_session_from_cookies(&jar).unwrap();
        assert_eq!(session.user.role, Role::Guest);
        assert_eq!(session.token, GUEST_TOKEN);
    }

    #[tokio::test]
    async fn log_in_redirects_to_requested_url() {
        let (state, _api) = get_state().await;
        let redirect_url = "/transactions/new";

        let response = new_log_in_request(
            state,
            LogInData {
                email: ADMIN_EMAIL.to_owned(),
                password: PASSWORD.to_owned(),
                redirect_url: Some(redirect_url.to_owned()),
            },
        )
        .await;

        assert_hx_redirect(&response, redirect_url);
    }

    #[tokio::test]
    async fn log_in_falls_back_on_invalid_redirect_url() {
        let (state, _api) = get_state().await;

        let response = new_log_in_request(
            state,
            LogInData {
                email: ADMIN_EMAIL.to_owned(),
                password: PASSWORD.to_owned(),
                redirect_url: Some("https://example.com".to_owned()),
            },
        )
        .await;

        assert_hx_redirect(&response, endpoints::DASHBOARD_VIEW);
    }

    #[tokio::test]
    async fn log_in_clears_stale_cache_for_token() {
        let (state, _api) = get_state().await;
        let cache = state.transaction_cache.clone();
        cache
            .replace(ADMIN_TOKEN, Vec::<Transaction>::new())
            .unwrap();

        new_log_in_request(
            state,
            LogInData {
                email: ADMIN_EMAIL.to_owned(),
                password: PASSWORD.to_owned(),
                redirect_url: None,
            },
        )
        .await;

        assert_eq!(cache.get(ADMIN_TOKEN).unwrap(), None);
    }

    #[tokio::test]
    async fn invalid_credentials_show_server_message_and_keep_email() {
        let (state, _api) = get_state().await;

        let response = new_log_in_request(
            state,
            LogInData {
                email: ADMIN_EMAIL.to_owned(),
                password: "wrong".to_owned(),
                redirect_url: None,
            },
        )
        .await;

        assert!(cookie_names(&response).is_empty());
        let html = parse_html_fragment(response).await;
        assert_valid_html(&html);
        let form = must_get_form(&html);
        let email = form
            .select(&Selector::parse("input#email").unwrap())
            .next()
            .unwrap();
        assert_eq!(email.value().attr("value"), Some(ADMIN_EMAIL));
        let error = form
            .select(&Selector::parse("input#password + p.text-red-500").unwrap())
            .next()
            .expect("No error message found");
        assert_eq!(error.text().collect::<String>(), "Invalid credentials");
    }

    #[tokio::test]
    async fn unreachable_api_shows_generic_error() {
        let state = AppState::new(
            "foobar",
            "Etc/UTC",
            ApiClient::new("http://127.0.0.1:1").unwrap(),
        );
        let state = LogInState::from_ref(&state);

        let response = new_log_in_request(
            state,
            LogInData {
                email: ADMIN_EMAIL.to_owned(),
                password: PASSWORD.to_owned(),
                redirect_url: None,
            },
        )
        .await;

        let html = parse_html_fragment(response).await;
        let text = html.root_element().text().collect::<String>();
        assert!(text.contains(LOG_IN_UNAVAILABLE_ERROR_MSG));
    }
}
