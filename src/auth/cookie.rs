//! Storing the session in private (encrypted and signed) cookies.

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use time::{Duration, OffsetDateTime};

use crate::{
    Error,
    auth::{Session, User},
};

/// The cookie holding the bearer token.
pub(crate) const COOKIE_TOKEN: &str = "token";
/// The cookie holding the user profile as JSON.
pub(crate) const COOKIE_USER: &str = "user";
/// How long the session cookies last after logging in.
pub(crate) const DEFAULT_COOKIE_DURATION: Duration = Duration::hours(8);

fn session_cookie(name: &'static str, value: String, expiry: OffsetDateTime) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .expires(expiry)
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(true)
        .build()
}

/// Add the token and user cookies to `jar`, valid for `duration` from now.
///
/// # Errors
///
/// Returns [Error::JSONSerializationError] if the user cannot be serialized.
pub(crate) fn set_session_cookies(
    jar: PrivateCookieJar,
    session: &Session,
    duration: Duration,
) -> Result<PrivateCookieJar, Error> {
    let user = serde_json::to_string(&session.user)
        .map_err(|error| Error::JSONSerializationError(error.to_string()))?;
    let expiry = OffsetDateTime::now_utc() + duration;

    Ok(jar
        .add(session_cookie(COOKIE_TOKEN, session.token.clone(), expiry))
        .add(session_cookie(COOKIE_USER, user, expiry)))
}

/// Set both session cookies to an invalid value and a max age of zero, which should delete them on the client side.
pub(crate) fn invalidate_session_cookies(jar: PrivateCookieJar) -> PrivateCookieJar {
    let expired = |name: &'static str| {
        let mut cookie = session_cookie(name, "deleted".to_owned(), OffsetDateTime::UNIX_EPOCH);
        cookie.set_max_age(Duration::ZERO);
        cookie
    };

    jar.add(expired(COOKIE_TOKEN)).add(expired(COOKIE_USER))
}

/// Read the session from `jar`.
///
/// # Errors
///
/// Returns:
/// - [Error::CookieMissing] if either cookie is absent or fails to decrypt.
/// - [Error::InvalidSessionCookie] if the token is empty or the user cannot be parsed.
pub(crate) fn get_session_from_cookies(jar: &PrivateCookieJar) -> Result<Session, Error> {
    let token = jar.get(COOKIE_TOKEN).ok_or(Error::CookieMissing)?;
    let user = jar.get(COOKIE_USER).ok_or(Error::CookieMissing)?;

    let token = token.value().trim();
    if token.is_empty() {
        return Err(Error::InvalidSessionCookie("empty token".to_owned()));
    }

    let user: User = serde_json::from_str(user.value())
        .map_err(|error| Error::InvalidSessionCookie(error.to_string()))?;

    Ok(Session {
        token: token.to_owned(),
        user,
    })
}
