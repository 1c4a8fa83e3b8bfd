use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `CFO_ASSISTANT__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub inter_agent: InterAgentConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

/// Analytics API the metrics are read from.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_upstream_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_upstream_timeout_ms")]
    pub timeout_ms: u64,
}

/// OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionConfig {
    #[serde(default = "default_completion_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_completion_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// Prior messages replayed to the model on each turn.
    #[serde(default = "default_max_history")]
    pub max_history: usize,
    #[serde(default = "default_max_report_chars")]
    pub max_report_chars: usize,
    #[serde(default = "default_title_max_chars")]
    pub title_max_chars: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InterAgentConfig {
    /// Shared secret expected in `x-inter-agent-secret`. Consultation is
    /// refused outright while this is unset.
    #[serde(default)]
    pub secret: Option<String>,
}

// Default functions
fn default_node_id() -> String {
    "cfo-01".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8080
}
fn default_metrics_port() -> u16 {
    9091
}
fn default_upstream_base_url() -> String {
    "http://localhost:8000/api/v1".to_string()
}
fn default_upstream_timeout_ms() -> u64 {
    10_000
}
fn default_completion_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_model() -> String {
    "gpt-4o".to_string()
}
fn default_max_tokens() -> u32 {
    2000
}
fn default_temperature() -> f32 {
    0.7
}
fn default_completion_timeout_secs() -> u64 {
    120
}
fn default_max_history() -> usize {
    20
}
fn default_max_report_chars() -> usize {
    12_000
}
fn default_title_max_chars() -> usize {
    80
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            port: default_metrics_port(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_upstream_base_url(),
            api_key: String::new(),
            timeout_ms: default_upstream_timeout_ms(),
        }
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: default_completion_base_url(),
            api_key: String::new(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_completion_timeout_secs(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
            max_report_chars: default_max_report_chars(),
            title_max_chars: default_title_max_chars(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            api: ApiConfig::default(),
            metrics: MetricsConfig::default(),
            upstream: UpstreamConfig::default(),
            completion: CompletionConfig::default(),
            chat: ChatConfig::default(),
            inter_agent: InterAgentConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("CFO_ASSISTANT")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.api.http_port, 8080);
        assert_eq!(config.completion.model, "gpt-4o");
        assert_eq!(config.completion.max_tokens, 2000);
        assert_eq!(config.chat.max_history, 20);
        assert_eq!(config.chat.title_max_chars, 80);
        assert!(config.inter_agent.secret.is_none());
    }

    #[test]
    fn test_empty_source_deserializes_to_defaults() {
        let config: AppConfig = config::Config::builder()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.node_id, "cfo-01");
        assert_eq!(config.upstream.timeout_ms, 10_000);
        assert!(config.upstream.api_key.is_empty());
    }
}
