//! A stand-in for the remote REST API, served on an ephemeral local port.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, Query, Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde_json::{Value, json};
use time::OffsetDateTime;

use crate::{
    api::wire,
    auth::{Role, User},
    transaction::Transaction,
};

pub(crate) const ADMIN_EMAIL: &str = "admin@example.com";
pub(crate) const GUEST_EMAIL: &str = "guest@example.com";
/// Logs in as the admin with [EXPIRED_TOKEN], so every later call is rejected.
pub(crate) const EXPIRED_EMAIL: &str = "expired@example.com";
pub(crate) const PASSWORD: &str = "hunter2";
pub(crate) const ADMIN_TOKEN: &str = "admin-token";
pub(crate) const GUEST_TOKEN: &str = "guest-token";
/// A token the stub always answers with 401.
pub(crate) const EXPIRED_TOKEN: &str = "expired-token";

pub(crate) fn admin_user() -> User {
    User {
        id: "1".to_owned(),
        name: "Admin".to_owned(),
        email: ADMIN_EMAIL.to_owned(),
        role: Role::SuperAdmin,
    }
}

pub(crate) fn guest_user() -> User {
    User {
        id: "2".to_owned(),
        name: "Guest".to_owned(),
        email: GUEST_EMAIL.to_owned(),
        role: Role::Guest,
    }
}

/// How the stub behaves.
#[derive(Debug, Clone)]
pub(crate) struct StubOptions {
    /// Initial contents of the transaction table.
    pub transactions: Vec<Transaction>,
    /// The value of `/transactions/today-total`.
    pub today_total: f64,
    /// Whether create and update responses contain the stored record.
    pub echo_records: bool,
    /// Whether create and update fail with a validation error.
    pub fail_writes: bool,
}

impl Default for StubOptions {
    fn default() -> Self {
        Self {
            transactions: Vec::new(),
            today_total: 0.0,
            echo_records: true,
            fail_writes: false,
        }
    }
}

/// A request as the stub received it.
#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub method: String,
    pub path_and_query: String,
    pub authorization: Option<String>,
    pub accept: Option<String>,
    pub body: String,
}

#[derive(Clone)]
struct StubState {
    options: Arc<StubOptions>,
    transactions: Arc<Mutex<Vec<Transaction>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    next_id: Arc<Mutex<u64>>,
}

/// A running stub API. The server lives until the test's runtime shuts down.
pub(crate) struct StubApi {
    pub base_url: String,
    state: StubState,
}

impl StubApi {
    pub(crate) async fn start(options: StubOptions) -> Self {
        let state = StubState {
            transactions: Arc::new(Mutex::new(options.transactions.clone())),
            options: Arc::new(options),
            requests: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(Mutex::new(100)),
        };

        let app = Router::new()
            .route("/login", post(log_in))
            .route("/transactions/today-total", get(today_total))
            .route("/transactions", get(list).post(create))
            .route("/transactions/{id}", put(update).delete(delete))
            .layer(middleware::from_fn_with_state(state.clone(), record_request))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Could not bind stub API listener");
        let address = listener
            .local_addr()
            .expect("Could not get stub API address");

        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Stub API server failed");
        });

        Self {
            base_url: format!("http://{address}"),
            state,
        }
    }

    /// Every request received so far, oldest first.
    pub(crate) fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// The stub's current transaction table.
    pub(crate) fn transactions(&self) -> Vec<Transaction> {
        self.state.transactions.lock().unwrap().clone()
    }
}

async fn record_request(State(state): State<StubState>, request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Could not read request body");
    let header_value = |name: header::HeaderName| {
        parts
            .headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
    };

    state.requests.lock().unwrap().push(RecordedRequest {
        method: parts.method.to_string(),
        path_and_query: parts
            .uri
            .path_and_query()
            .map(|path| path.as_str().to_owned())
            .unwrap_or_default(),
        authorization: header_value(header::AUTHORIZATION),
        accept: header_value(header::ACCEPT),
        body: String::from_utf8_lossy(&bytes).to_string(),
    });

    next.run(Request::from_parts(parts, Body::from(bytes)))
        .await
}

fn message(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn authorize(headers: &HeaderMap) -> Result<(), Response> {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if authorization == format!("Bearer {ADMIN_TOKEN}")
        || authorization == format!("Bearer {GUEST_TOKEN}")
    {
        Ok(())
    } else {
        Err(message(StatusCode::UNAUTHORIZED, "Unauthenticated."))
    }
}

async fn log_in(Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();

    let (user, token) = match (email, password) {
        (ADMIN_EMAIL, PASSWORD) => (admin_user(), ADMIN_TOKEN),
        (GUEST_EMAIL, PASSWORD) => (guest_user(), GUEST_TOKEN),
        (EXPIRED_EMAIL, PASSWORD) => (admin_user(), EXPIRED_TOKEN),
        _ => return message(StatusCode::UNAUTHORIZED, "Invalid credentials"),
    };

    Json(json!({
        "user": {"id": user.id.parse::<u64>().unwrap(), "name": user.name, "email": user.email, "role": user.role},
        "token": token,
    }))
    .into_response()
}

async fn today_total(State(state): State<StubState>, headers: HeaderMap) -> Response {
    if let Err(response) = authorize(&headers) {
        return response;
    }

    Json(json!({ "total": state.options.today_total })).into_response()
}

async fn list(
    State(state): State<StubState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if let Err(response) = authorize(&headers) {
        return response;
    }

    let name = query.get("name").map(|name| name.to_lowercase());
    let date = query.get("date").and_then(|date| wire::date::parse(date).ok());
    let data: Vec<Transaction> = state
        .transactions
        .lock()
        .unwrap()
        .iter()
        .filter(|transaction| date.is_none_or(|date| transaction.date == date))
        .filter(|transaction| {
            name.as_ref()
                .is_none_or(|name| transaction.name.to_lowercase().contains(name))
        })
        .cloned()
        .collect();

    Json(json!({ "data": data })).into_response()
}

fn apply_fields(transaction: &mut Transaction, body: &Value) {
    if let Some(name) = body["name"].as_str() {
        transaction.name = name.to_owned();
    }
    if let Some(amount) = body["amount"].as_f64() {
        transaction.amount = amount;
    }
    if let Some(date) = body["date"].as_str().and_then(|date| wire::date::parse(date).ok()) {
        transaction.date = date;
    }
    if let Some(description) = body["description"].as_str() {
        transaction.description = Some(description.to_owned());
    }
}

async fn create(
    State(state): State<StubState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(response) = authorize(&headers) {
        return response;
    }
    if state.options.fail_writes {
        return message(StatusCode::UNPROCESSABLE_ENTITY, "The name field is required.");
    }

    let id = {
        let mut next_id = state.next_id.lock().unwrap();
        *next_id += 1;
        *next_id
    };
    let now = OffsetDateTime::now_utc().replace_nanosecond(0).unwrap();
    let mut transaction = Transaction {
        id: id.to_string(),
        name: String::new(),
        amount: 0.0,
        date: now.date(),
        description: None,
        created_at: Some(now),
        updated_at: Some(now),
    };
    apply_fields(&mut transaction, &body);
    state.transactions.lock().unwrap().insert(0, transaction.clone());

    if state.options.echo_records {
        (StatusCode::CREATED, Json(json!({ "data": transaction }))).into_response()
    } else {
        message(StatusCode::CREATED, "Transaction created")
    }
}

async fn update(
    State(state): State<StubState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(response) = authorize(&headers) {
        return response;
    }
    if state.options.fail_writes {
        return message(StatusCode::UNPROCESSABLE_ENTITY, "The name field is required.");
    }

    let mut transactions = state.transactions.lock().unwrap();
    let Some(transaction) = transactions
        .iter_mut()
        .find(|transaction| transaction.id == id)
    else {
        return message(StatusCode::NOT_FOUND, "Transaction not found");
    };

    apply_fields(transaction, &body);
    transaction.updated_at = Some(OffsetDateTime::now_utc().replace_nanosecond(0).unwrap());

    if state.options.echo_records {
        Json(json!(transaction)).into_response()
    } else {
        message(StatusCode::OK, "Transaction updated")
    }
}

async fn delete(
    State(state): State<StubState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Err(response) = authorize(&headers) {
        return response;
    }

    let mut transactions = state.transactions.lock().unwrap();
    let count = transactions.len();
    transactions.retain(|transaction| transaction.id != id);

    if transactions.len() == count {
        message(StatusCode::NOT_FOUND, "Transaction not found")
    } else {
        message(StatusCode::OK, "Transaction deleted")
    }
}
