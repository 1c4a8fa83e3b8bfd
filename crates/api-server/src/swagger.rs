//! OpenAPI specification and Swagger UI configuration.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Clinic CFO Assistant API",
        version = "0.1.0",
        description = "Virtual CFO for dental clinics.\n\nConversational financial assistant grounded in live clinic analytics, patient-acquisition funnel dashboard and inter-agent consultation.",
    ),
    tags(
        (name = "Chat", description = "Assistant turns and conversation history"),
        (name = "Funnel", description = "Seven-stage patient funnel with findings and recommendations"),
        (name = "Consult", description = "Single-question consultation for other agents"),
        (name = "Operations", description = "Health, readiness, and liveness probes"),
    ),
    paths(
        // Chat
        crate::chat_rest::send_message,
        crate::chat_rest::list_conversations,
        crate::chat_rest::create_conversation,
        crate::chat_rest::get_conversation,
        crate::chat_rest::delete_conversation,
        // Funnel
        crate::funnel_rest::funnel_analysis,
        // Consult
        crate::consult_rest::consult,
        // Operations
        crate::rest::health_check,
        crate::rest::readiness,
        crate::rest::liveness,
    ),
    components(schemas(
        // Chat types
        cfo_core::chat::ChatRole,
        cfo_core::chat::MessageView,
        cfo_core::chat::ConversationSummary,
        cfo_core::chat::ConversationDetail,
        cfo_core::chat::CreateConversationRequest,
        cfo_core::chat::SendMessageRequest,
        cfo_core::chat::SendMessageResult,
        crate::chat_rest::DeletedConversation,
        // Funnel types
        cfo_core::funnel::Period,
        cfo_core::funnel::DateRange,
        cfo_core::funnel::ReconciledMetrics,
        cfo_core::funnel::FunnelStage,
        cfo_core::funnel::FunnelEdge,
        cfo_core::funnel::Severity,
        cfo_core::funnel::Priority,
        cfo_core::funnel::Finding,
        cfo_core::funnel::Recommendation,
        cfo_core::funnel::FunnelKpis,
        cfo_core::funnel::FunnelAnalysis,
        // Consult types
        cfo_core::chat::ConsultRequest,
        cfo_core::chat::ConsultResponse,
        // REST error/health types
        crate::rest::ErrorResponse,
        crate::rest::HealthResponse,
    ))
)]
pub struct ApiDoc;
