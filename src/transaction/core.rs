//! Defines the core data models for transactions.

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::api::wire::{self, deserialize_amount, deserialize_id};

/// The ID the API assigned to a transaction.
///
/// IDs are opaque to this application; they are only compared and echoed back.
pub type TransactionId = String;

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// The API owns transactions. This is a read-through copy that may be
/// optimistically patched, see [crate::transaction::TransactionCache].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    #[serde(deserialize_with = "deserialize_id")]
    pub id: TransactionId,
    /// A short name for what the transaction was for, e.g. "Coffee".
    pub name: String,
    /// The amount of money spent or earned in this transaction.
    ///
    /// Positive values represent income, negative values represent expenses.
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: f64,
    /// When the transaction happened.
    #[serde(with = "wire::date")]
    pub date: Date,
    /// Optional free text about the transaction.
    #[serde(default)]
    pub description: Option<String>,
    /// When the API first stored the transaction.
    #[serde(default, with = "wire::timestamp")]
    pub created_at: Option<OffsetDateTime>,
    /// When the transaction was last changed.
    #[serde(default, with = "wire::timestamp")]
    pub updated_at: Option<OffsetDateTime>,
}

impl Transaction {
    /// Build a local stand-in for a transaction the API accepted but did not echo back.
    ///
    /// The ID is the current Unix time in milliseconds and both timestamps are `now`.
    pub fn optimistic(new_transaction: NewTransaction, now: OffsetDateTime) -> Self {
        let id = (now.unix_timestamp_nanos() / 1_000_000).to_string();

        Self {
            id,
            name: new_transaction.name,
            amount: new_transaction.amount,
            date: new_transaction.date,
            description: new_transaction.description,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    /// Overwrite the fields that are set in `patch` and bump `updated_at` to `now`.
    pub fn apply_patch(&mut self, patch: &TransactionPatch, now: OffsetDateTime) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }

        if let Some(amount) = patch.amount {
            self.amount = amount;
        }

        if let Some(date) = patch.date {
            self.date = date;
        }

        if let Some(description) = &patch.description {
            self.description = Some(description.clone());
        }

        self.updated_at = Some(now);
    }
}

/// The fields sent to the API to create a transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTransaction {
    pub name: String,
    pub amount: f64,
    #[serde(with = "wire::date")]
    pub date: Date,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A partial update to a transaction. Only the fields that are set are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransactionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_optional_date"
    )]
    pub date: Option<Date>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn serialize_optional_date<S>(date: &Option<Date>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match date {
        Some(date) => wire::date::serialize(date, serializer),
        None => serializer.serialize_none(),
    }
}
