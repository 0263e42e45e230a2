//! Transactions: the data model, the per-session cache, and the pages and
//! endpoints for listing, creating, editing and deleting them.

mod cache;
mod core;
mod create_endpoint;
mod create_page;
mod delete_endpoint;
mod edit_endpoint;
mod edit_page;
mod filter;
mod form;
mod table;

pub use cache::{TransactionCache, load_transactions};
pub use core::{NewTransaction, Transaction, TransactionId, TransactionPatch};
pub use create_endpoint::create_transaction_endpoint;
pub use create_page::get_create_transaction_page;
pub use delete_endpoint::delete_transaction_endpoint;
pub use edit_endpoint::edit_transaction_endpoint;
pub use edit_page::get_edit_transaction_page;
pub use filter::{FilterQuery, TransactionFilter, filter_transactions};
pub use table::{filter_form, get_transactions_table, transactions_table, transactions_table_error};
