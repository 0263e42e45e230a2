//! Narrowing the cached transaction list by date and name.

use serde::Deserialize;
use time::Date;

use crate::{api::wire, transaction::Transaction};

/// Which transactions to show. An absent field matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    /// Only transactions on exactly this date.
    pub date: Option<Date>,
    /// Only transactions whose name contains this, ignoring case.
    pub name: Option<String>,
}

impl TransactionFilter {
    /// Whether `transaction` passes the filter.
    pub fn matches(&self, transaction: &Transaction) -> bool {
        let date_matches = self.date.is_none_or(|date| transaction.date == date);
        let name_matches = match self.name.as_deref() {
            None | Some("") => true,
            Some(name) => transaction
                .name
                .to_lowercase()
                .contains(&name.to_lowercase()),
        };

        date_matches && name_matches
    }

    /// The query string pairs for the fields that are set.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();

        if let Some(date) = self
            .date
            .and_then(|date| date.format(wire::date::DATE_FORMAT).ok())
        {
            pairs.push(("date", date));
        }

        if let Some(name) = self.name.as_deref().filter(|name| !name.is_empty()) {
            pairs.push(("name", name.to_owned()));
        }

        pairs
    }

    /// Whether any field is set.
    pub fn is_active(&self) -> bool {
        self.date.is_some() || self.name.as_deref().is_some_and(|name| !name.is_empty())
    }
}

/// The filter as it arrives from the filter form's query string.
///
/// Browsers send empty strings for blank inputs, which are treated as unset.
/// The name is matched exactly as typed, spaces included.
#[derive(Debug, Default, Deserialize)]
pub struct FilterQuery {
    pub date: Option<String>,
    pub name: Option<String>,
}

impl From<FilterQuery> for TransactionFilter {
    fn from(query: FilterQuery) -> Self {
        let date = query
            .date
            .filter(|date| !date.trim().is_empty())
            .and_then(|date| match wire::date::parse(&date) {
                Ok(date) => Some(date),
                Err(error) => {
                    tracing::warn!("Ignoring invalid filter date \"{date}\": {error}");
                    None
                }
            });
        let name = query.name.filter(|name| !name.is_empty());

        Self { date, name }
    }
}

/// The transactions in `transactions` that pass `filter`, in their original order.
pub fn filter_transactions<'a>(
    transactions: &'a [Transaction],
    filter: &TransactionFilter,
) -> Vec<&'a Transaction> {
    if !filter.is_active() {
        return transactions.iter().collect();
    }

    transactions
        .iter()
        .filter(|transaction| filter.matches(transaction))
        .collect()
}
