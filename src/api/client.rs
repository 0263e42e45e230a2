//! One async method per REST endpoint of the remote API.

use axum::body::Bytes;
use reqwest::{
    Client, Method, RequestBuilder, StatusCode, Url,
    header::{ACCEPT, HeaderValue},
};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    api::wire::deserialize_amount,
    auth::User,
    transaction::{NewTransaction, Transaction, TransactionFilter, TransactionPatch},
};

const LOG_IN_FAILED: &str = "Login failed";
const TODAY_TOTAL_FAILED: &str = "Get today total failed";
const LIST_TRANSACTIONS_FAILED: &str = "Get transaction failed";
const CREATE_TRANSACTION_FAILED: &str = "Create transaction failed";
const UPDATE_TRANSACTION_FAILED: &str = "Update transaction failed";
const DELETE_TRANSACTION_FAILED: &str = "Delete transaction failed";

/// The email and password a user logs in with.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// The body of a successful log-in.
#[derive(Debug, Clone, Deserialize)]
pub struct LogInResponse {
    pub user: User,
    pub token: String,
}

#[derive(Deserialize)]
struct TodayTotalResponse {
    #[serde(deserialize_with = "deserialize_amount")]
    total: f64,
}

#[derive(Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Talks JSON to the remote API.
///
/// Every call is independent: there is no timeout, retry or cancellation.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for the API rooted at `base_url`, e.g. "http://localhost:8000/api".
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidApiUrl] if `base_url` is not an absolute HTTP(S) URL.
    pub fn new(base_url: &str) -> Result<Self, Error> {
        let base_url = base_url.trim_end_matches('/').to_owned();

        match Url::parse(&base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => return Err(Error::InvalidApiUrl(base_url)),
        }

        let client = Client::builder()
            .build()
            .map_err(|error| Error::ApiUnreachable(error.to_string()))?;

        Ok(Self { client, base_url })
    }

    /// The base URL every request path is appended to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Exchange an email and password for a bearer token and the user's profile.
    ///
    /// # Errors
    ///
    /// Any non-2xx status is [Error::InvalidCredentials] with the server's message.
    pub async fn log_in(&self, credentials: &Credentials) -> Result<LogInResponse, Error> {
        let request = self.request(Method::POST, "/login").json(credentials);
        let body = match self.send(request).await? {
            (status, body) if status.is_success() => body,
            (_, body) => {
                return Err(Error::InvalidCredentials(error_message(
                    &body,
                    LOG_IN_FAILED,
                )));
            }
        };

        decode(&body)
    }

    /// Get the sum of the amounts of today's transactions.
    pub async fn today_total(&self, token: &str) -> Result<f64, Error> {
        let request = self.authenticated(Method::GET, "/transactions/today-total", token);
        let body = self.send_authenticated(request, TODAY_TOTAL_FAILED).await?;
        let response: TodayTotalResponse = decode(&body)?;

        Ok(response.total)
    }

    /// Get the transactions matching `filter`. Unset filter fields are not sent.
    pub async fn list_transactions(
        &self,
        token: &str,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, Error> {
        let request = self
            .authenticated(Method::GET, "/transactions", token)
            .query(&filter.query_pairs());
        let body = self
            .send_authenticated(request, LIST_TRANSACTIONS_FAILED)
            .await?;
        let response: DataEnvelope<Vec<Transaction>> = decode(&body)?;

        Ok(response.data)
    }

    /// Create a transaction.
    ///
    /// Returns the stored record if the response body contains one.
    pub async fn create_transaction(
        &self,
        token: &str,
        new_transaction: &NewTransaction,
    ) -> Result<Option<Transaction>, Error> {
        let request = self
            .authenticated(Method::POST, "/transactions", token)
            .json(new_transaction);
        let body = self
            .send_authenticated(request, CREATE_TRANSACTION_FAILED)
            .await?;

        Ok(decode_record(&body))
    }

    /// Change the fields of transaction `id` that are set in `patch`.
    ///
    /// Returns the stored record if the response body contains one.
    pub async fn update_transaction(
        &self,
        token: &str,
        id: &str,
        patch: &TransactionPatch,
    ) -> Result<Option<Transaction>, Error> {
        let request = self
            .authenticated(Method::PUT, &transaction_path(id), token)
            .json(patch);
        let body = self
            .send_authenticated(request, UPDATE_TRANSACTION_FAILED)
            .await?;

        Ok(decode_record(&body))
    }

    /// Delete transaction `id`.
    pub async fn delete_transaction(&self, token: &str, id: &str) -> Result<(), Error> {
        let request = self.authenticated(Method::DELETE, &transaction_path(id), token);
        self.send_authenticated(request, DELETE_TRANSACTION_FAILED)
            .await?;

        Ok(())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header(ACCEPT, HeaderValue::from_static("application/json"))
    }

    fn authenticated(&self, method: Method, path: &str, token: &str) -> RequestBuilder {
        self.request(method, path).bearer_auth(token)
    }

    async fn send(&self, request: RequestBuilder) -> Result<(StatusCode, Bytes), Error> {
        let request = request.build()?;
        let method = request.method().clone();
        let path = request.url().path().to_owned();

        let response = self.client.execute(request).await.inspect_err(|error| {
            tracing::error!("{method} {path} failed: {error}");
        })?;
        let status = response.status();
        let body = response.bytes().await?;

        tracing::debug!("{method} {path} -> {status}");

        Ok((status, body))
    }

    /// Send a request made with a bearer token.
    ///
    /// A 401 means the token is no longer valid and becomes [Error::Unauthorized].
    async fn send_authenticated(
        &self,
        request: RequestBuilder,
        fallback_message: &str,
    ) -> Result<Bytes, Error> {
        match self.send(request).await? {
            (status, body) if status.is_success() => Ok(body),
            (StatusCode::UNAUTHORIZED, _) => Err(Error::Unauthorized),
            (status, body) => {
                let message = error_message(&body, fallback_message);
                tracing::warn!("API answered {status}: {message}");
                Err(Error::ApiRequestFailed(message))
            }
        }
    }
}

fn transaction_path(id: &str) -> String {
    format!("/transactions/{}", urlencoding::encode(id))
}

fn decode<'a, T: Deserialize<'a>>(body: &'a [u8]) -> Result<T, Error> {
    serde_json::from_slice(body).map_err(|error| {
        tracing::error!("Could not decode API response: {error}");
        Error::InvalidApiResponse(error.to_string())
    })
}

/// Read a transaction from a write response, either bare or wrapped in `{"data": ...}`.
fn decode_record(body: &[u8]) -> Option<Transaction> {
    serde_json::from_slice::<Transaction>(body)
        .or_else(|_| serde_json::from_slice::<DataEnvelope<Transaction>>(body).map(|e| e.data))
        .inspect_err(|_| tracing::debug!("API response did not contain a transaction record"))
        .ok()
}

/// The `message` field of an error body, or `fallback`.
fn error_message(body: &[u8], fallback: &str) -> String {
    serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|body| body.message)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| fallback.to_owned())
}
