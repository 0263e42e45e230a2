//! Authentication middleware that loads the session from cookies, gates
//! admin-only routes, and logs the user out when the API rejects their token.

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;

use crate::{
    AppState, Error,
    auth::{
        Session, SessionRejected,
        cookie::{get_session_from_cookies, invalidate_session_cookies},
        redirect::log_in_url_for,
    },
    transaction::TransactionCache,
};

/// The state needed for the auth middleware
#[derive(Clone)]
pub struct AuthState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// Evicted when the API rejects a session's token.
    pub transaction_cache: TransactionCache,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            transaction_cache: state.transaction_cache.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AuthState> for Key {
    fn from_ref(state: &AuthState) -> Self {
        state.cookie_key.clone()
    }
}

#[inline]
async fn auth_guard_internal(
    state: AuthState,
    request: Request,
    next: Next,
    get_redirect: impl Fn(&str) -> Response,
) -> Response {
    let log_in_url = log_in_url_for(&request);

    let (mut parts, body) = request.into_parts();
    let jar = match PrivateCookieJar::from_request_parts(&mut parts, &state).await {
        Ok(jar) => jar,
        Err(err) => {
            tracing::error!("Error getting cookie jar: {err:?}. Redirecting to log in page.");
            return get_redirect(&log_in_url);
        }
    };
    let session = match get_session_from_cookies(&jar) {
        Ok(session) => session,
        Err(error) => {
            tracing::debug!("No valid session ({error}). Redirecting to log in page.");
            return get_redirect(&log_in_url);
        }
    };
    let token = session.token.clone();

    parts.extensions.insert(session);
    let request = Request::from_parts(parts, body);
    let response = next.run(request).await;

    if response.extensions().get::<SessionRejected>().is_none() {
        return response;
    }

    tracing::info!("The API rejected the session token. Logging out.");
    if let Err(error) = state.transaction_cache.evict(&token) {
        tracing::error!("Could not evict cached transactions: {error}");
    }

    (invalidate_session_cookies(jar), get_redirect(&log_in_url)).into_response()
}

/// Middleware function that checks for valid session cookies.
///
/// The [Session] is placed into the request and the request executed normally if the cookies are valid, otherwise a redirect to the log-in page is returned.
/// If the handler reports that the API rejected the token, the session is cleared and the client is redirected to the log-in page.
///
/// **Note**: Route handlers can use the function argument `Extension(session): Extension<Session>` to receive the session.
pub async fn auth_guard(State(state): State<AuthState>, request: Request, next: Next) -> Response {
    auth_guard_internal(state, request, next, |redirect_url| {
        Redirect::to(redirect_url).into_response()
    })
    .await
}

/// Same as [auth_guard], but redirects with the `HX-Redirect` header for htmx requests.
pub async fn auth_guard_hx(
    State(state): State<AuthState>,
    request: Request,
    next: Next,
) -> Response {
    auth_guard_internal(state, request, next, |redirect_url| {
        (HxRedirect(redirect_url.to_owned()), StatusCode::OK).into_response()
    })
    .await
}

/// Middleware function that only lets `super_admin` users through.
///
/// Must run after [auth_guard] or [auth_guard_hx], i.e. be added as an inner layer.
pub async fn admin_guard(request: Request, next: Next) -> Response {
    let is_api_request = request.uri().path().starts_with("/api");
    let respond = |error: Error| {
        if is_api_request {
            error.into_alert_response()
        } else {
            error.into_response()
        }
    };

    let user = request
        .extensions()
        .get::<Session>()
        .map(|session| session.user.clone());

    match user {
        Some(user) if user.is_admin() => next.run(request).await,
        Some(user) => {
            tracing::warn!(
                "User {} ({}) tried to access {}",
                user.id,
                user.role,
                request.uri().path()
            );
            respond(Error::Forbidden)
        }
        None => {
            tracing::error!("No session in request extensions. Is admin_guard outside auth_guard?");
            respond(Error::Forbidden)
        }
    }
}

#[cfg(test)]
mod auth_guard_tests {
    use axum::{
        Extension, Router,
        extract::State,
        http::StatusCode,
        middleware,
        response::Html,
        routing::{get, post},
    };
    use axum_extra::extract::{
        PrivateCookieJar,
        cookie::{Cookie, Key},
    };
    use axum_test::TestServer;
    use sha2::Digest;
    use time::OffsetDateTime;

    use crate::{
        Error,
        auth::{
            AuthState, DEFAULT_COOKIE_DURATION, Session, admin_guard, auth_guard, auth_guard_hx,
            cookie::{COOKIE_TOKEN, COOKIE_USER, set_session_cookies},
        },
        endpoints,
        test_utils::stub_api::{ADMIN_TOKEN, GUEST_TOKEN, admin_user, guest_user},
        transaction::TransactionCache,
    };

    async fn test_handler(Extension(session): Extension<Session>) -> Html<String> {
        Html(format!("<h1>Hello, {}!</h1>", session.user.name))
    }

    async fn rejected_handler() -> Error {
        Error::Unauthorized
    }

    async fn stub_log_in_route(
        State(state): State<AuthState>,
        jar: PrivateCookieJar,
        role: String,
    ) -> Result<PrivateCookieJar, Error> {
        let session = if role == "guest" {
            Session {
                token: GUEST_TOKEN.to_owned(),
                user: guest_user(),
            }
        } else {
            Session {
                token: ADMIN_TOKEN.to_owned(),
                user: admin_user(),
            }
        };
        state
            .transaction_cache
            .replace(&session.token, Vec::new())?;

        set_session_cookies(jar, &session, DEFAULT_COOKIE_DURATION)
    }

    const TEST_LOG_IN_ROUTE: &str = "/test_log_in";
    const TEST_PROTECTED_ROUTE: &str = "/protected";
    const TEST_ADMIN_ROUTE: &str = "/admin";
    const TEST_REJECTED_ROUTE: &str = "/rejected";
    const TEST_API_ROUTE: &str = "/api/protected";
    const TEST_API_REJECTED_ROUTE: &str = "/api/rejected";

    fn get_state() -> AuthState {
        let hash = sha2::Sha512::digest("nafstenoas");
        AuthState {
            cookie_key: Key::from(&hash),
            transaction_cache: TransactionCache::default(),
        }
    }

    fn get_test_server(state: AuthState) -> TestServer {
        let admin_routes = Router::new()
            .route(TEST_ADMIN_ROUTE, get(test_handler))
            .layer(middleware::from_fn(admin_guard));

        let page_routes = Router::new()
            .route(TEST_PROTECTED_ROUTE, get(test_handler))
            .route(TEST_REJECTED_ROUTE, get(rejected_handler))
            .merge(admin_routes)
            .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard));

        let api_routes = Router::new()
            .route(TEST_API_ROUTE, get(test_handler))
            .route(TEST_API_REJECTED_ROUTE, get(rejected_handler))
            .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard_hx));

        let app = Router::new()
            .merge(page_routes)
            .merge(api_routes)
            .route(TEST_LOG_IN_ROUTE, post(stub_log_in_route))
            .with_state(state);

        TestServer::try_new(app).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn get_protected_route_with_valid_cookies() {
        let server = get_test_server(get_state());
        let response = server.post(TEST_LOG_IN_ROUTE).text("admin").await;
        response.assert_status_ok();
        let jar = response.cookies();

        let response = server.get(TEST_PROTECTED_ROUTE).add_cookies(jar).await;

        response.assert_status_ok();
        response.assert_text("<h1>Hello, Admin!</h1>");
    }

    #[tokio::test]
    async fn get_protected_route_with_no_cookies_redirects_to_log_in() {
        let server = get_test_server(get_state());
        let response = server.get(TEST_PROTECTED_ROUTE).await;

        response.assert_status_see_other();
        let expected_query =
            serde_urlencoded::to_string([("redirect_url", TEST_PROTECTED_ROUTE)]).unwrap();
        let expected_location = format!("{}?{}", endpoints::LOG_IN_VIEW, expected_query);
        assert_eq!(response.header("location"), expected_location);
    }

    #[tokio::test]
    async fn get_protected_route_with_tampered_cookies_redirects_to_log_in() {
        let server = get_test_server(get_state());
        let response = server
            .get(TEST_PROTECTED_ROUTE)
            .add_cookie(Cookie::new(COOKIE_TOKEN, "FOOBAR"))
            .add_cookie(Cookie::new(COOKIE_USER, "{}"))
            .await;

        response.assert_status_see_other();
    }

    #[tokio::test]
    async fn api_route_uses_hx_current_url_for_redirect() {
        let server = get_test_server(get_state());
        let current_url = "/dashboard?name=cof";
        let response = server
            .get(TEST_API_ROUTE)
            .add_header("HX-Request", "true")
            .add_header("HX-Current-URL", current_url)
            .await;

        response.assert_status_ok();
        let expected_query = serde_urlencoded::to_string([("redirect_url", current_url)]).unwrap();
        let expected_location = format!("{}?{}", endpoints::LOG_IN_VIEW, expected_query);
        assert_eq!(response.header("hx-redirect"), expected_location);
    }

    #[tokio::test]
    async fn rejected_token_clears_session_and_redirects() {
        let state = get_state();
        let server = get_test_server(state.clone());
        let response = server.post(TEST_LOG_IN_ROUTE).text("admin").await;
        let jar = response.cookies();

        let response = server.get(TEST_REJECTED_ROUTE).add_cookies(jar).await;

        response.assert_status_see_other();
        assert!(
            response
                .header("location")
                .to_str()
                .unwrap()
                .starts_with(endpoints::LOG_IN_VIEW)
        );
        for name in [COOKIE_TOKEN, COOKIE_USER] {
            assert_eq!(
                response.cookie(name).expires_datetime(),
                Some(OffsetDateTime::UNIX_EPOCH),
                "want {name} cookie to be expired"
            );
        }
        assert_eq!(state.transaction_cache.get(ADMIN_TOKEN).unwrap(), None);
    }

    #[tokio::test]
    async fn rejected_token_on_api_route_uses_hx_redirect() {
        let server = get_test_server(get_state());
        let response = server.post(TEST_LOG_IN_ROUTE).text("admin").await;
        let jar = response.cookies();

        let response = server
            .get(TEST_API_REJECTED_ROUTE)
            .add_cookies(jar)
            .add_header("HX-Request", "true")
            .add_header("HX-Current-URL", "/dashboard")
            .await;

        response.assert_status_ok();
        let expected_query = serde_urlencoded::to_string([("redirect_url", "/dashboard")]).unwrap();
        assert_eq!(
            response.header("hx-redirect"),
            format!("{}?{}", endpoints::LOG_IN_VIEW, expected_query)
        );
        assert_eq!(
            response.cookie(COOKIE_TOKEN).expires_datetime(),
            Some(OffsetDateTime::UNIX_EPOCH)
        );
    }

    #[tokio::test]
    async fn admin_route_allows_admin() {
        let server = get_test_server(get_state());
        let jar = server.post(TEST_LOG_IN_ROUTE).text("admin").await.cookies();

        let response = server.get(TEST_ADMIN_ROUTE).add_cookies(jar).await;

        response.assert_status_ok();
    }

    #[tokio::test]
    async fn admin_route_forbids_guest() {
        let server = get_test_server(get_state());
        let jar = server.post(TEST_LOG_IN_ROUTE).text("guest").await.cookies();

        let response = server.get(TEST_ADMIN_ROUTE).add_cookies(jar).await;

        response.assert_status(StatusCode::FORBIDDEN);
    }
}
