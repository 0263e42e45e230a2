//! Logging in and out against the remote API, and the middleware that
//! protects routes with the resulting session.

mod cookie;
mod log_in;
mod log_out;
mod middleware;
mod redirect;
mod session;
mod user;

pub(crate) use cookie::DEFAULT_COOKIE_DURATION;
pub use log_in::{get_log_in_page, post_log_in};
pub use log_out::get_log_out;
pub use middleware::{admin_guard, auth_guard, auth_guard_hx};
pub use session::{Session, SessionRejected};
pub use user::User;

#[cfg(test)]
pub(crate) use cookie::{COOKIE_TOKEN, COOKIE_USER};
#[cfg(test)]
pub(crate) use middleware::AuthState;
#[cfg(test)]
pub(crate) use user::Role;
