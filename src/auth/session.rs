//! The logged-in user's credentials as they travel between the cookies, the
//! middleware and the route handlers.

use crate::auth::User;

/// A bearer token and the profile of the user it belongs to.
///
/// The auth middleware places this in the request extensions, so route
/// handlers can take `Extension(session): Extension<Session>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// The token sent as `Authorization: Bearer <token>` to the API.
    pub token: String,
    /// The user returned by the API at log-in.
    pub user: User,
}

/// Response extension marking that the API rejected the session's token.
///
/// The auth middleware reacts by clearing the session and sending the
/// client to the log-in page.
#[derive(Debug, Clone, Copy)]
pub struct SessionRejected;
