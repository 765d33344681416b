//! Bounty Ledger Server
//!
//! HTTP surface over the ledger service: read-only queries and a single
//! signed-transaction endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

use crate::auth::{authenticate, ReplayGuard, SignedCall};
use crate::bounty;
use crate::error::{ErrorBody, LedgerError};
use crate::events::EventRecord;
use crate::reputation::accuracy_percent;
use crate::service::{CallOutput, LedgerCall, LedgerService, ServiceError};
use crate::types::{
    Address, Amount, Appeal, BlockHeight, GlobalState, Report, ReportId, ReputationRecord,
    SeverityPolicy, VERIFICATION_THRESHOLD,
};

const DEFAULT_EVENT_PAGE: usize = 100;
const MAX_EVENT_PAGE: usize = 1000;

pub struct AppState {
    pub service: Arc<LedgerService>,
    pub replay: ReplayGuard,
    pub started_at: std::time::Instant,
}

impl AppState {
    pub fn new(service: Arc<LedgerService>) -> Self {
        Self {
            service,
            replay: ReplayGuard::new(),
            started_at: std::time::Instant::now(),
        }
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/config", get(config_handler))
        .route("/state", get(state_handler))
        .route("/reports/:id", get(report_handler))
        .route("/reporters/:address", get(reporter_handler))
        .route("/appeals/:id", get(appeal_handler))
        .route("/auditors/:address", get(auditor_handler))
        .route("/balances/:address", get(balance_handler))
        .route("/events", get(events_handler))
        .route("/tx", post(tx_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(status: StatusCode, name: &str, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            code: u32::from(status.as_u16()),
            name: name.to_string(),
            message: message.into(),
        }),
    )
}

fn not_found() -> ApiError {
    let err = LedgerError::NotFound;
    (StatusCode::NOT_FOUND, Json(ErrorBody::from(&err)))
}

/// HTTP status for a rejected ledger call
pub fn status_for(err: &LedgerError) -> StatusCode {
    match err {
        LedgerError::OwnerOnly | LedgerError::UnauthorizedAI | LedgerError::NotAuthorized => {
            StatusCode::FORBIDDEN
        }
        LedgerError::NotFound => StatusCode::NOT_FOUND,
        LedgerError::AlreadyProcessed
        | LedgerError::InvalidTransition { .. }
        | LedgerError::AppealWindowClosed => StatusCode::CONFLICT,
        LedgerError::InvalidScore | LedgerError::InvalidSeverity(_) => StatusCode::BAD_REQUEST,
        LedgerError::InsufficientStake { .. } => StatusCode::PAYMENT_REQUIRED,
        LedgerError::ContractPaused => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// ============================================================================
// STATUS
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub uptime_secs: u64,
    pub version: String,
    pub height: BlockHeight,
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        healthy: true,
        uptime_secs: state.started_at.elapsed().as_secs(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        height: state.service.height(),
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigResponse {
    pub governance: String,
    pub treasury: Address,
    pub stake_pool: Address,
    pub appeal_window_blocks: u64,
    pub starting_reputation: u64,
    pub severity_policy: SeverityPolicy,
    pub verification_threshold: u8,
    pub base_rewards: Vec<(String, Amount)>,
}

async fn config_handler(State(state): State<Arc<AppState>>) -> Json<ConfigResponse> {
    let (governance, params) = state
        .service
        .read(|l| (l.policy().describe(), l.params().clone()));
    let base_rewards = [
        ("critical", bounty::CRITICAL_BASE),
        ("high", bounty::HIGH_BASE),
        ("medium", bounty::MEDIUM_BASE),
        ("low", bounty::LOW_BASE),
    ]
    .into_iter()
    .map(|(tier, base)| (tier.to_string(), base))
    .collect();

    Json(ConfigResponse {
        governance,
        treasury: params.treasury,
        stake_pool: params.stake_pool,
        appeal_window_blocks: params.appeal_window_blocks,
        starting_reputation: params.starting_reputation,
        severity_policy: params.severity_policy,
        verification_threshold: VERIFICATION_THRESHOLD,
        base_rewards,
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StateResponse {
    #[serde(flatten)]
    pub state: GlobalState,
    pub height: BlockHeight,
    pub last_event: Option<u64>,
}

async fn state_handler(State(state): State<Arc<AppState>>) -> Json<StateResponse> {
    let height = state.service.height();
    let (global, last_event) = state
        .service
        .read(|l| (l.global_state().clone(), l.latest_event().map(|r| r.seq)));
    Json(StateResponse {
        state: global,
        height,
        last_event,
    })
}

// ============================================================================
// QUERIES
// ============================================================================

async fn report_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ReportId>,
) -> Result<Json<Report>, ApiError> {
    state
        .service
        .read(|l| l.get_report(id).cloned())
        .map(Json)
        .ok_or_else(not_found)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReporterResponse {
    pub address: Address,
    #[serde(flatten)]
    pub stats: ReputationRecord,
    pub accuracy_percent: Option<u64>,
}

async fn reporter_handler(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Result<Json<ReporterResponse>, ApiError> {
    let address = Address::new(address);
    let stats = state
        .service
        .read(|l| l.get_reporter_stats(&address).cloned())
        .ok_or_else(not_found)?;
    Ok(Json(ReporterResponse {
        accuracy_percent: accuracy_percent(&stats),
        address,
        stats,
    }))
}

async fn appeal_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ReportId>,
) -> Result<Json<Appeal>, ApiError> {
    state
        .service
        .read(|l| l.get_appeal(id).cloned())
        .map(Json)
        .ok_or_else(not_found)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuditorResponse {
    pub address: Address,
    pub is_auditor: bool,
}

async fn auditor_handler(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Json<AuditorResponse> {
    let address = Address::new(address);
    let is_auditor = state.service.read(|l| l.is_auditor(&address));
    Json(AuditorResponse {
        address,
        is_auditor,
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub address: Address,
    pub balance: Amount,
}

async fn balance_handler(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Json<BalanceResponse> {
    let address = Address::new(address);
    let balance = state.service.read(|l| l.balance_of(&address));
    Json(BalanceResponse { address, balance })
}

#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    pub since: Option<u64>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EventsResponse {
    pub events: Vec<EventRecord>,
    /// Pass as `since` to fetch the next page
    pub next_since: u64,
}

async fn events_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventsQuery>,
) -> Json<EventsResponse> {
    let since = query.since.unwrap_or(0);
    let limit = query
        .limit
        .unwrap_or(DEFAULT_EVENT_PAGE)
        .clamp(1, MAX_EVENT_PAGE);
    let events = state.service.read(|l| l.events_since(since, limit));
    let next_since = events.last().map(|r| r.seq).unwrap_or(since);
    Json(EventsResponse { events, next_since })
}

// ============================================================================
// POST /tx - signed ledger calls
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct TxResponse {
    pub ok: bool,
    #[serde(default)]
    pub result: Option<CallOutput>,
    #[serde(default)]
    pub error: Option<ErrorBody>,
}

impl TxResponse {
    fn accepted(result: CallOutput) -> Self {
        Self {
            ok: true,
            result: Some(result),
            error: None,
        }
    }

    fn failed(error: ErrorBody) -> Self {
        Self {
            ok: false,
            result: None,
            error: Some(error),
        }
    }
}

fn tx_error(status: StatusCode, name: &str, message: impl Into<String>) -> (StatusCode, Json<TxResponse>) {
    let (status, Json(body)) = api_error(status, name, message);
    (status, Json(TxResponse::failed(body)))
}

async fn tx_handler(
    State(state): State<Arc<AppState>>,
    Json(call): Json<SignedCall>,
) -> (StatusCode, Json<TxResponse>) {
    let caller = match authenticate(&call, &state.replay) {
        Ok(caller) => caller,
        Err(e) => {
            debug!("Rejected signed call from {}: {}", call.caller, e);
            return tx_error(StatusCode::UNAUTHORIZED, "Unauthorized", e.to_string());
        }
    };

    let ledger_call: LedgerCall = match serde_json::from_str(&call.payload) {
        Ok(c) => c,
        Err(e) => {
            return tx_error(StatusCode::BAD_REQUEST, "InvalidPayload", e.to_string());
        }
    };

    match state.service.execute(&caller, ledger_call) {
        Ok(output) => (StatusCode::OK, Json(TxResponse::accepted(output))),
        Err(ServiceError::Ledger(e)) => (
            status_for(&e),
            Json(TxResponse::failed(ErrorBody::from(&e))),
        ),
        Err(ServiceError::Storage(e)) => tx_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "StorageError",
            format!("{:#}", e),
        ),
    }
}

/// Run the server
pub async fn run_server(host: &str, port: u16, service: Arc<LedgerService>) -> anyhow::Result<()> {
    let state = Arc::new(AppState::new(service));

    let app = create_router(state);
    let addr = format!("{}:{}", host, port);

    info!("Starting Bounty Ledger server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
