//! # REST API
//!
//! Builds the axum router that exposes the ledger over HTTP. All endpoints
//! share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path              | Description                              |
//! |--------|-------------------|------------------------------------------|
//! | GET    | `/health`         | Liveness check                           |
//! | GET    | `/status`         | Version and registry summary             |
//! | POST   | `/invoke`         | Mutating operation, positional arguments |
//! | POST   | `/query`          | Read-only operation, positional arguments|
//! | POST   | `/requests`       | Typed `LedgerRequest`                    |
//! | GET    | `/accounts`       | Account registry                         |
//! | GET    | `/accounts/:id`   | Account record                           |
//!
//! ## Ordering
//!
//! Mutating operations run one at a time under `invoke_lock`. Each gets its
//! own [`StagedStore`]; the staged writes are committed as one batch when the
//! contract succeeds and dropped when it fails. Queries read the committed
//! store without taking the lock.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use tally_contracts::{
    AccountLedger, ErrorKind, LedgerError, LedgerRequest, LedgerResult, Operation,
    Response as LedgerResponse,
};
use tally_protocol::{SledStore, StagedStore, StoreError};

use crate::metrics::{SharedMetrics, OUTCOME_OK};

/// Header carrying the caller id for per-caller authorization.
pub const CALLER_HEADER: &str = "x-caller-id";

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone. Everything is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// Contract instance with its authorization policy.
    pub ledger: AccountLedger,
    /// Committed ledger state.
    pub store: Arc<SledStore>,
    /// Serializes mutating invocations.
    pub invoke_lock: Arc<Mutex<()>>,
    /// Reference to Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
}

impl AppState {
    pub fn new(
        version: String,
        ledger: AccountLedger,
        store: SledStore,
        metrics: SharedMetrics,
    ) -> Self {
        Self {
            version,
            ledger,
            store: Arc::new(store),
            invoke_lock: Arc::new(Mutex::new(())),
            metrics,
        }
    }

    /// Number of registered accounts, or zero before the first `init`.
    fn registered_count(&self) -> usize {
        self.ledger
            .get_all_account_ids(&*self.store)
            .map(|registry| registry.len())
            .unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/invoke", post(invoke_handler))
        .route("/query", post(query_handler))
        .route("/requests", post(request_handler))
        .route("/accounts", get(accounts_handler))
        .route("/accounts/:id", get(account_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// Body of `POST /invoke` and `POST /query`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CallRequest {
    /// Operation name.
    pub function: String,
    /// Positional string arguments.
    #[serde(default)]
    pub args: Vec<String>,
}

/// Successful reply to an operation. `result` is `null` for mutations.
#[derive(Debug, Serialize)]
pub struct CallResponse {
    pub function: String,
    pub result: LedgerResponse,
}

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Node software version.
    pub version: String,
    /// Contract surface version.
    pub contract_version: String,
    /// Accounts currently in the registry.
    pub registered_accounts: usize,
    /// ISO-8601 timestamp of the response.
    pub timestamp: String,
}

/// Error body returned on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: ErrorKind,
}

/// A contract error on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub LedgerError);

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        ApiError(e)
    }
}

/// HTTP status for an error category.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidInput | ErrorKind::UnknownOperation => StatusCode::BAD_REQUEST,
        ErrorKind::AuthError => StatusCode::FORBIDDEN,
        ErrorKind::UnregisteredAccount | ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InsufficientFunds | ErrorKind::InsufficientLoyalty => StatusCode::CONFLICT,
        ErrorKind::StorageError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status = status_for(kind);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "ledger storage failure");
        }
        let body = ErrorResponse {
            error: self.0.to_string(),
            kind,
        };
        (status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// Metric label for a function name. Unrecognized names collapse into one
/// label.
fn operation_label(function: &str) -> &'static str {
    Operation::from_name(function)
        .map(|op| op.name())
        .unwrap_or("unknown")
}

/// Counts the outcome of an operation and passes the result through.
fn observe<T>(state: &AppState, label: &str, result: LedgerResult<T>) -> LedgerResult<T> {
    let outcome = match &result {
        Ok(_) => OUTCOME_OK,
        Err(e) => e.kind().as_str(),
    };
    state.metrics.record(label, outcome);
    result
}

/// Runs a mutating operation under the invocation lock against a fresh
/// staging overlay, committing only on success.
///
/// The contract and the sled commit run on the blocking pool. The lock guard
/// moves into that task, so the next invocation waits for the commit even if
/// this request is abandoned.
async fn run_invocation<F>(
    state: &AppState,
    label: &'static str,
    call: F,
) -> LedgerResult<LedgerResponse>
where
    F: FnOnce(&AccountLedger, &StagedStore<'_, SledStore>) -> LedgerResult<LedgerResponse>
        + Send
        + 'static,
{
    let guard = Arc::clone(&state.invoke_lock).lock_owned().await;
    let ledger = state.ledger.clone();
    let store = Arc::clone(&state.store);
    let latency = state
        .metrics
        .invocation_latency_seconds
        .with_label_values(&[label]);

    let task = tokio::task::spawn_blocking(move || {
        let _guard = guard;
        let timer = latency.start_timer();
        let staged = StagedStore::new(&*store);
        let result = call(&ledger, &staged).and_then(|response| {
            let writes = staged.commit()?;
            tracing::debug!(operation = label, writes, "invocation committed");
            Ok(response)
        });
        timer.observe_duration();

        let registered = result.as_ref().ok().map(|_| {
            ledger
                .get_all_account_ids(&*store)
                .map(|registry| registry.len())
                .unwrap_or(0)
        });
        (result, registered)
    });

    let result = match task.await {
        Ok((result, registered)) => {
            if let Some(count) = registered {
                state.metrics.registered_accounts.set(count as i64);
            }
            result
        }
        Err(e) => Err(LedgerError::from(StoreError::Unavailable(format!(
            "invocation task failed: {}",
            e
        )))),
    };
    observe(state, label, result)
}

fn caller_from(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CALLER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`: returns 200 while the process is alive.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status`: version and registry size.
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(StatusResponse {
        version: state.version.clone(),
        contract_version: tally_protocol::config::CONTRACT_VERSION.to_string(),
        registered_accounts: state.registered_count(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// `POST /invoke`: runs a mutating operation with positional arguments.
async fn invoke_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CallRequest>,
) -> Result<Json<CallResponse>, ApiError> {
    let caller = caller_from(&headers);
    let label = operation_label(&req.function);
    let function = req.function.clone();
    let args = req.args;
    let result = run_invocation(&state, label, move |ledger, store| {
        ledger.invoke(store, &function, &args, caller.as_deref())
    })
    .await?;

    Ok(Json(CallResponse {
        function: req.function,
        result,
    }))
}

/// `POST /query`: runs a read-only operation against committed state.
async fn query_handler(
    State(state): State<AppState>,
    Json(req): Json<CallRequest>,
) -> Result<Json<CallResponse>, ApiError> {
    let label = operation_label(&req.function);
    let result = observe(
        &state,
        label,
        state.ledger.query(&*state.store, &req.function, &req.args),
    )?;

    Ok(Json(CallResponse {
        function: req.function,
        result,
    }))
}

/// `POST /requests`: runs a typed request. Queries skip the invocation lock.
async fn request_handler(
    State(state): State<AppState>,
    Json(request): Json<LedgerRequest>,
) -> Result<Json<CallResponse>, ApiError> {
    let op = request.operation();
    let result = if op.is_query() {
        observe(&state, op.name(), state.ledger.execute(&*state.store, request))?
    } else {
        run_invocation(&state, op.name(), move |ledger, store| ledger.execute(store, request))
            .await?
    };

    Ok(Json(CallResponse {
        function: op.name().to_string(),
        result,
    }))
}

/// `GET /accounts`: the account registry.
async fn accounts_handler(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let label = Operation::GetAllAccountIds.name();
    let registry = observe(&state, label, state.ledger.get_all_account_ids(&*state.store))?;
    Ok(Json(registry))
}

/// `GET /accounts/:id`: one account record.
async fn account_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let label = Operation::GetAccountDetails.name();
    let account = observe(
        &state,
        label,
        state.ledger.get_account_details(&*state.store, &id),
    )?;
    Ok(Json(account))
}
