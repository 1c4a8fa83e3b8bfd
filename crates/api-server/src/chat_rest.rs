//! Chat and conversation REST endpoints.

use crate::auth::AuthUser;
use crate::rest::{
    api_error, json_body, ApiResponse, ApiResult, AppState, ErrorResponse, INTERNAL_MESSAGE,
};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use cfo_core::chat::{
    ConversationDetail, ConversationSummary, CreateConversationRequest, SendMessageRequest,
    SendMessageResult,
};
use cfo_core::CfoError;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

const SEND_FAILED_MESSAGE: &str = "Could not generate a response";

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ConversationListQuery {
    /// Restrict the listing to one clinic.
    pub centro_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeletedConversation {
    pub id: Uuid,
}

fn parse_id(raw: &str) -> Result<Uuid, CfoError> {
    Uuid::parse_str(raw)
        .map_err(|_| CfoError::InvalidInput(format!("invalid conversation id: {raw}")))
}

/// POST /api/chat/send: Run one assistant turn.
#[utoipa::path(
    post,
    path = "/api/chat/send",
    tag = "Chat",
    request_body = SendMessageRequest,
    params(("x-user-id" = String, Header, description = "Authenticated user id")),
    responses(
        (status = 200, description = "Assistant reply, wrapped in the success envelope", body = SendMessageResult),
        (status = 400, description = "Malformed body, missing message or clinic", body = ErrorResponse),
        (status = 401, description = "No authenticated user", body = ErrorResponse),
        (status = 404, description = "Conversation not found", body = ErrorResponse),
        (status = 500, description = "Response could not be generated", body = ErrorResponse),
    )
)]
pub async fn send_message(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    body: Result<Json<SendMessageRequest>, JsonRejection>,
) -> ApiResult<SendMessageResult> {
    let request = json_body(body)?;
    state
        .chat
        .send(&user, request)
        .await
        .map(ApiResponse::ok)
        .map_err(|e| api_error(e, SEND_FAILED_MESSAGE))
}

/// GET /api/chat/conversations: List the caller's conversations.
#[utoipa::path(
    get,
    path = "/api/chat/conversations",
    tag = "Chat",
    params(
        ConversationListQuery,
        ("x-user-id" = String, Header, description = "Authenticated user id"),
    ),
    responses(
        (status = 200, description = "Most recently updated first, at most 50", body = [ConversationSummary]),
        (status = 401, description = "No authenticated user", body = ErrorResponse),
    )
)]
pub async fn list_conversations(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<ConversationListQuery>,
) -> ApiResult<Vec<ConversationSummary>> {
    state
        .chat
        .store()
        .list(&user, query.centro_id)
        .await
        .map(ApiResponse::ok)
        .map_err(|e| api_error(e, INTERNAL_MESSAGE))
}

/// POST /api/chat/conversations: Create an empty conversation.
#[utoipa::path(
    post,
    path = "/api/chat/conversations",
    tag = "Chat",
    request_body = CreateConversationRequest,
    params(("x-user-id" = String, Header, description = "Authenticated user id")),
    responses(
        (status = 200, description = "Conversation created", body = ConversationSummary),
        (status = 400, description = "Malformed body or missing clinic", body = ErrorResponse),
        (status = 401, description = "No authenticated user", body = ErrorResponse),
    )
)]
pub async fn create_conversation(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    body: Result<Json<CreateConversationRequest>, JsonRejection>,
) -> ApiResult<ConversationSummary> {
    let request = json_body(body)?;
    let clinic_id = request.clinic_id.ok_or_else(|| {
        api_error(
            CfoError::InvalidInput("centroId is required".to_string()),
            INTERNAL_MESSAGE,
        )
    })?;

    let conversation = state
        .chat
        .store()
        .create(&user, clinic_id, request.title)
        .await
        .map_err(|e| api_error(e, INTERNAL_MESSAGE))?;
    metrics::counter!("chat.conversations.created").increment(1);
    Ok(ApiResponse::ok(ConversationSummary::from(&conversation)))
}

/// GET /api/chat/conversations/:id: One conversation with its messages.
#[utoipa::path(
    get,
    path = "/api/chat/conversations/{id}",
    tag = "Chat",
    params(
        ("id" = String, Path, description = "Conversation id"),
        ("x-user-id" = String, Header, description = "Authenticated user id"),
    ),
    responses(
        (status = 200, description = "Conversation with messages in chronological order", body = ConversationDetail),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 404, description = "Not found or not owned", body = ErrorResponse),
    )
)]
pub async fn get_conversation(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<ConversationDetail> {
    let id = parse_id(&id).map_err(|e| api_error(e, INTERNAL_MESSAGE))?;
    let conversation = state
        .chat
        .store()
        .get(&user, id)
        .await
        .map_err(|e| api_error(e, INTERNAL_MESSAGE))?
        .ok_or_else(|| {
            api_error(
                CfoError::NotFound("conversation not found".to_string()),
                INTERNAL_MESSAGE,
            )
        })?;
    Ok(ApiResponse::ok(ConversationDetail::from(&conversation)))
}

/// DELETE /api/chat/conversations/:id: Delete a conversation and its messages.
#[utoipa::path(
    delete,
    path = "/api/chat/conversations/{id}",
    tag = "Chat",
    params(
        ("id" = String, Path, description = "Conversation id"),
        ("x-user-id" = String, Header, description = "Authenticated user id"),
    ),
    responses(
        (status = 200, description = "Deleted", body = DeletedConversation),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 404, description = "Not found or not owned", body = ErrorResponse),
    )
)]
pub async fn delete_conversation(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<DeletedConversation> {
    let id = parse_id(&id).map_err(|e| api_error(e, INTERNAL_MESSAGE))?;
    let deleted = state
        .chat
        .store()
        .delete(&user, id)
        .await
        .map_err(|e| api_error(e, INTERNAL_MESSAGE))?;
    if !deleted {
        return Err(api_error(
            CfoError::NotFound("conversation not found".to_string()),
            INTERNAL_MESSAGE,
        ));
    }
    metrics::counter!("chat.conversations.deleted").increment(1);
    Ok(ApiResponse::ok(DeletedConversation { id }))
}
