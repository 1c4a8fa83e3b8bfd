//! Inter-agent consultation endpoint.

use crate::auth::{header_value, INTER_AGENT_SECRET_HEADER};
use crate::rest::{api_error, parse_json, ApiError, AppState, ErrorResponse, INTERNAL_MESSAGE};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use cfo_core::chat::{ConsultRequest, ConsultResponse};

/// POST /api/v1/brain/consult: Single-question consultation by another agent.
#[utoipa::path(
    post,
    path = "/api/v1/brain/consult",
    tag = "Consult",
    request_body = ConsultRequest,
    params(("x-inter-agent-secret" = String, Header, description = "Shared inter-agent secret")),
    responses(
        (status = 200, description = "Answer; confidence 0 when the model was unavailable", body = ConsultResponse),
        (status = 400, description = "Malformed body or empty question", body = ErrorResponse),
        (status = 401, description = "Missing or wrong secret", body = ErrorResponse),
    )
)]
pub async fn consult(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ConsultResponse>, ApiError> {
    let secret = header_value(&headers, INTER_AGENT_SECRET_HEADER);
    state
        .consult
        .authorize(secret.as_deref())
        .map_err(|e| api_error(e, INTERNAL_MESSAGE))?;
    let request: ConsultRequest = parse_json(&body)?;

    state
        .consult
        .consult(secret.as_deref(), request)
        .await
        .map(Json)
        .map_err(|e| api_error(e, INTERNAL_MESSAGE))
}
