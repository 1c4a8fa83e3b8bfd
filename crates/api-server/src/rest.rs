//! Shared REST state, response envelopes and operational endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use cfo_assistant::{ChatService, ConsultService};
use cfo_core::CfoError;
use cfo_reporting::FunnelDashboard;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, warn};
use utoipa::ToSchema;

/// Generic message returned for failures whose cause stays in the logs.
pub const INTERNAL_MESSAGE: &str = "Internal server error";

/// Shared application state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChatService>,
    pub consult: Arc<ConsultService>,
    pub funnel: Arc<FunnelDashboard>,
    pub node_id: String,
    pub start_time: Instant,
}

/// `{ "success": true, "data": ... }`
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

pub fn status_for(err: &CfoError) -> StatusCode {
    match err {
        CfoError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        CfoError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        CfoError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Map a domain error to its HTTP response. Client errors keep their
/// message; anything else is logged with its cause and answered with
/// `internal_message`.
pub fn api_error(err: CfoError, internal_message: &str) -> ApiError {
    let status = status_for(&err);
    let message = if err.is_client_error() {
        warn!(code = err.code(), error = %err, "Request rejected");
        err.to_string()
    } else {
        error!(error = %err, "Request failed");
        metrics::counter!("api.errors").increment(1);
        internal_message.to_string()
    };
    (
        status,
        Json(ErrorResponse {
            error: err.code().to_string(),
            message,
        }),
    )
}

/// Unwrap an extracted JSON body. Rejections become `invalid_input`.
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value).map_err(|rejection| {
        api_error(
            CfoError::InvalidInput(format!("malformed request body: {}", rejection.body_text())),
            INTERNAL_MESSAGE,
        )
    })
}

/// Decode a raw JSON body.
pub fn parse_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(bytes).map_err(|e| {
        api_error(
            CfoError::InvalidInput(format!("malformed request body: {e}")),
            INTERNAL_MESSAGE,
        )
    })
}

/// GET /health: Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Operations",
    responses((status = 200, description = "Service is healthy", body = HealthResponse))
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        node_id: state.node_id.clone(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// GET /ready: Readiness probe.
#[utoipa::path(
    get,
    path = "/ready",
    tag = "Operations",
    responses((status = 200, description = "Ready to accept traffic"))
)]
pub async fn readiness() -> StatusCode {
    StatusCode::OK
}

/// GET /live: Liveness probe.
#[utoipa::path(
    get,
    path = "/live",
    tag = "Operations",
    responses((status = 200, description = "Process is alive"))
)]
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub node_id: String,
    pub uptime_secs: u64,
}
