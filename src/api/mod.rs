//! The client for the remote REST API that owns users and transactions.

mod client;
pub mod wire;

pub use client::{ApiClient, Credentials};
