//! Dashboard module
//!
//! The landing page after log-in. Everyone sees today's total; administrators
//! also get the transaction table with its filter form.

mod cards;
mod handlers;

pub use handlers::get_dashboard_page;
