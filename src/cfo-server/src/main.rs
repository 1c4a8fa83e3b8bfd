//! Clinic CFO Assistant: virtual CFO chat and funnel dashboard for dental clinics.
//!
//! Main entry point that wires the service clients and starts the server.

use cfo_api::{ApiServer, AppState};
use cfo_assistant::{
    ChatService, ConsultService, ContextAssembler, InMemoryConversationStore, OpenAiClient,
};
use cfo_core::config::AppConfig;
use cfo_reporting::FunnelDashboard;
use cfo_upstream::UpstreamClient;
use clap::Parser;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "cfo-server")]
#[command(about = "Virtual CFO assistant and funnel dashboard for dental clinics")]
#[command(version)]
struct Cli {
    /// Node identifier (overrides config)
    #[arg(long, env = "CFO_ASSISTANT__NODE_ID")]
    node_id: Option<String>,

    /// Bind address (overrides config)
    #[arg(long, env = "CFO_ASSISTANT__API__HOST")]
    host: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "CFO_ASSISTANT__API__HTTP_PORT")]
    http_port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cfo_server=info,cfo_api=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("Clinic CFO Assistant starting up");

    // Load configuration
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    // Apply CLI overrides
    if let Some(node_id) = cli.node_id {
        config.node_id = node_id;
    }
    if let Some(host) = cli.host {
        config.api.host = host;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }

    info!(
        node_id = %config.node_id,
        http_port = config.api.http_port,
        upstream = %config.upstream.base_url,
        model = %config.completion.model,
        "Configuration loaded"
    );
    if config.completion.api_key.is_empty() {
        warn!("Completion API key is not set, chat turns will fail");
    }
    if config.inter_agent.secret.is_none() {
        warn!("Inter-agent secret is not set, consultation is disabled");
    }

    // Service clients
    let upstream = Arc::new(UpstreamClient::new(&config.upstream)?);
    let completion = Arc::new(OpenAiClient::new(config.completion.clone())?);
    let store = Arc::new(InMemoryConversationStore::new());

    let chat = ChatService::new(
        store,
        ContextAssembler::new(upstream.clone(), config.chat.max_report_chars),
        completion.clone(),
        config.chat.clone(),
    );
    let consult = ConsultService::new(completion, config.inter_agent.secret.clone());
    let funnel = FunnelDashboard::new(upstream);

    let state = AppState {
        chat: Arc::new(chat),
        consult: Arc::new(consult),
        funnel: Arc::new(funnel),
        node_id: config.node_id.clone(),
        start_time: Instant::now(),
    };

    let api_server = ApiServer::new(config, state);

    // Start metrics exporter
    if let Err(e) = api_server.start_metrics().await {
        error!(error = %e, "Failed to start metrics exporter");
    }

    info!("Clinic CFO Assistant is ready to serve traffic");

    // Start HTTP server (blocks until shutdown)
    api_server.start_http().await?;

    Ok(())
}
