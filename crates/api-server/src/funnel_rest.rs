//! Funnel dashboard REST endpoint.

use crate::auth::{bearer_token, AuthUser};
use crate::rest::{api_error, ApiResponse, ApiResult, AppState, ErrorResponse, INTERNAL_MESSAGE};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use cfo_core::funnel::{FunnelAnalysis, Period};
use cfo_core::CfoError;
use serde::Deserialize;
use tracing::debug;
use utoipa::IntoParams;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FunnelQuery {
    /// Clinic to analyse.
    pub centro_id: Option<i64>,
    /// `mese` (default), `trimestre` or `anno`.
    pub periodo: Option<String>,
}

/// GET /api/funnel: Seven-stage funnel, findings and recommendations.
#[utoipa::path(
    get,
    path = "/api/funnel",
    tag = "Funnel",
    params(
        FunnelQuery,
        ("x-user-id" = String, Header, description = "Authenticated user id"),
    ),
    responses(
        (status = 200, description = "Funnel analysis, wrapped in the success envelope", body = FunnelAnalysis),
        (status = 400, description = "Missing clinic or unknown period", body = ErrorResponse),
        (status = 401, description = "No authenticated user", body = ErrorResponse),
    )
)]
pub async fn funnel_analysis(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    headers: HeaderMap,
    Query(query): Query<FunnelQuery>,
) -> ApiResult<FunnelAnalysis> {
    let clinic_id = query.centro_id.ok_or_else(|| {
        api_error(
            CfoError::InvalidInput("centro_id is required".to_string()),
            INTERNAL_MESSAGE,
        )
    })?;
    let period = match query.periodo.as_deref() {
        None | Some("") => Period::default(),
        Some(raw) => Period::from_query(raw).ok_or_else(|| {
            api_error(
                CfoError::InvalidInput(format!("unknown period: {raw}")),
                INTERNAL_MESSAGE,
            )
        })?,
    };

    debug!(user = %user, clinic_id, period = period.as_query(), "Funnel requested");
    let token = bearer_token(&headers);
    let analysis = state
        .funnel
        .analyze(clinic_id, period, token.as_deref())
        .await;
    Ok(ApiResponse::ok(analysis))
}
