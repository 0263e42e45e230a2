//! The per-session copy of the transaction list shown on the dashboard.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use time::{Duration, OffsetDateTime};

use crate::{
    ApiClient, Error,
    auth::DEFAULT_COOKIE_DURATION,
    transaction::{NewTransaction, Transaction, TransactionFilter, TransactionPatch},
};

#[derive(Debug)]
struct CachedList {
    transactions: Vec<Transaction>,
    touched_at: OffsetDateTime,
}

type Lists = HashMap<String, CachedList>;

/// The most recently fetched transaction list for each session, keyed by bearer token.
///
/// The API is the source of truth. A list is replaced whenever it is fetched
/// and patched optimistically after each successful write, so the dashboard
/// can render without another round trip. Writes to a session with no list
/// are ignored; the next read fetches a fresh one.
///
/// Lists not used for longer than the time to live are dropped the next time
/// any list is fetched, so sessions that simply expire do not pile up.
#[derive(Debug, Clone)]
pub struct TransactionCache {
    lists: Arc<Mutex<Lists>>,
    time_to_live: Duration,
}

impl Default for TransactionCache {
    fn default() -> Self {
        Self::new(DEFAULT_COOKIE_DURATION)
    }
}

impl TransactionCache {
    /// Create an empty cache that forgets lists unused for `time_to_live`.
    pub fn new(time_to_live: Duration) -> Self {
        Self {
            lists: Arc::default(),
            time_to_live,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Lists>, Error> {
        self.lists.lock().map_err(|error| {
            tracing::error!("Transaction cache lock is poisoned: {error}");
            Error::CacheLockError
        })
    }

    /// The cached list for `token`, or `None` if it has not been fetched.
    pub fn get(&self, token: &str) -> Result<Option<Vec<Transaction>>, Error> {
        Ok(touch(&mut *self.lock()?, token).cloned())
    }

    /// Find one transaction in the cached list for `token`.
    pub fn find(&self, token: &str, id: &str) -> Result<Option<Transaction>, Error> {
        Ok(touch(&mut *self.lock()?, token).and_then(|transactions| {
            transactions
                .iter()
                .find(|transaction| transaction.id == id)
                .cloned()
        }))
    }

    /// Store a freshly fetched list, dropping whatever was cached before.
    pub fn replace(&self, token: &str, transactions: Vec<Transaction>) -> Result<(), Error> {
        let now = OffsetDateTime::now_utc();
        let mut lists = self.lock()?;
        sweep(&mut lists, now, self.time_to_live);
        lists.insert(
            token.to_owned(),
            CachedList {
                transactions,
                touched_at: now,
            },
        );

        Ok(())
    }

    /// Put a transaction the API sent back at the front of the list.
    pub fn prepend(&self, token: &str, transaction: Transaction) -> Result<(), Error> {
        if let Some(transactions) = touch(&mut *self.lock()?, token) {
            transactions.insert(0, transaction);
        }

        Ok(())
    }

    /// Put a local stand-in for a transaction the API did not echo back at
    /// the front of the list.
    ///
    /// The time-based ID is bumped until no other cached transaction has it.
    /// Returns the ID that was used.
    pub fn prepend_optimistic(
        &self,
        token: &str,
        new_transaction: NewTransaction,
        now: OffsetDateTime,
    ) -> Result<String, Error> {
        let mut transaction = Transaction::optimistic(new_transaction, now);

        if let Some(transactions) = touch(&mut *self.lock()?, token) {
            while transactions.iter().any(|other| other.id == transaction.id) {
                transaction.id = next_id(&transaction.id);
            }
            transactions.insert(0, transaction.clone());
        }

        Ok(transaction.id)
    }

    /// Apply an update to transaction `id`.
    ///
    /// If the API sent back a record with the same ID it replaces the cached
    /// entry, otherwise `patch` is merged in and `updated_at` set to `now`.
    /// Returns whether an entry was changed.
    pub fn update(
        &self,
        token: &str,
        id: &str,
        patch: &TransactionPatch,
        server_record: Option<Transaction>,
        now: OffsetDateTime,
    ) -> Result<bool, Error> {
        let mut lists = self.lock()?;
        let Some(transaction) = touch(&mut lists, token)
            .and_then(|transactions| transactions.iter_mut().find(|t| t.id == id))
        else {
            return Ok(false);
        };

        match server_record {
            Some(record) if record.id == id => *transaction = record,
            _ => transaction.apply_patch(patch, now),
        }

        Ok(true)
    }

    /// Remove transaction `id`, leaving every other entry untouched.
    ///
    /// Returns whether an entry was removed.
    pub fn remove(&self, token: &str, id: &str) -> Result<bool, Error> {
        let mut lists = self.lock()?;
        let Some(transactions) = touch(&mut lists, token) else {
            return Ok(false);
        };

        let count = transactions.len();
        transactions.retain(|transaction| transaction.id != id);

        Ok(transactions.len() < count)
    }

    /// Forget the list for `token`, e.g. on log-out.
    pub fn evict(&self, token: &str) -> Result<(), Error> {
        self.lock()?.remove(token);
        Ok(())
    }
}

/// The list for `token`, marked as used just now.
fn touch<'a>(lists: &'a mut Lists, token: &str) -> Option<&'a mut Vec<Transaction>> {
    lists.get_mut(token).map(|list| {
        list.touched_at = OffsetDateTime::now_utc();
        &mut list.transactions
    })
}

/// Drop every list that has not been used since `now - time_to_live`.
///
/// Returns how many lists were dropped.
fn sweep(lists: &mut Lists, now: OffsetDateTime, time_to_live: Duration) -> usize {
    let count = lists.len();
    lists.retain(|_, list| now - list.touched_at <= time_to_live);
    let swept = count - lists.len();

    if swept > 0 {
        tracing::debug!("Dropped {swept} expired transaction lists");
    }

    swept
}

fn next_id(id: &str) -> String {
    match id.parse::<i128>() {
        Ok(number) => (number + 1).to_string(),
        Err(_) => format!("{id}-1"),
    }
}

/// The transaction list for `token`, fetched from the API if it is not
/// cached or `refresh` is set.
///
/// The full list is fetched; filtering happens locally.
pub async fn load_transactions(
    api: &ApiClient,
    cache: &TransactionCache,
    token: &str,
    refresh: bool,
) -> Result<Vec<Transaction>, Error> {
    if !refresh && let Some(transactions) = cache.get(token)? {
        return Ok(transactions);
    }

    let transactions = api
        .list_transactions(token, &TransactionFilter::default())
        .await?;
    tracing::debug!("Fetched {} transactions", transactions.len());
    cache.replace(token, transactions.clone())?;

    Ok(transactions)
}
