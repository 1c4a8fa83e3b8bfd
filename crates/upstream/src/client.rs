//! HTTP client for the analytics API.

use async_trait::async_trait;
use cfo_core::config::UpstreamConfig;
use cfo_core::{CfoError, CfoResult};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// A read-only source of clinic analytics.
///
/// `None` means "source unavailable" and is never an error for the caller.
#[async_trait]
pub trait AnalyticsSource: Send + Sync {
    async fn fetch(&self, endpoint: &str, clinic_id: i64, auth_token: Option<&str>)
        -> Option<Value>;
}

/// Build the request URL, appending the clinic as `centro_id`.
pub fn build_url(base_url: &str, endpoint: &str, clinic_id: i64) -> String {
    let separator = if endpoint.contains('?') { '&' } else { '?' };
    format!(
        "{}{}{}centro_id={}",
        base_url.trim_end_matches('/'),
        endpoint,
        separator,
        clinic_id
    )
}

pub struct UpstreamClient {
    base_url: String,
    api_key: String,
    client: Client,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> CfoResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| CfoError::Config(format!("failed to build upstream client: {e}")))?;

        Ok(Self {
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            client,
        })
    }
}

#[async_trait]
impl AnalyticsSource for UpstreamClient {
    async fn fetch(
        &self,
        endpoint: &str,
        clinic_id: i64,
        auth_token: Option<&str>,
    ) -> Option<Value> {
        let url = build_url(&self.base_url, endpoint, clinic_id);

        let mut request = self
            .client
            .get(&url)
            .header("X-API-Key", &self.api_key)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json");
        if let Some(token) = auth_token.filter(|t| !t.is_empty()) {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(endpoint, clinic_id, error = %e, "Upstream request failed");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(endpoint, clinic_id, status = status.as_u16(), "Upstream returned non-success status");
            return None;
        }

        match response.json::<Value>().await {
            Ok(body) => {
                debug!(endpoint, clinic_id, "Upstream request succeeded");
                Some(body)
            }
            Err(e) => {
                warn!(endpoint, clinic_id, error = %e, "Upstream body is not valid JSON");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Answers a single request with `status` and `body`; yields the raw
    /// request head, lowercased.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            String::from_utf8_lossy(&head).to_lowercase()
        });
        (format!("http://{addr}"), handle)
    }

    fn client_for(base_url: String) -> UpstreamClient {
        UpstreamClient::new(&UpstreamConfig {
            base_url,
            api_key: "k1".to_string(),
            timeout_ms: 2_000,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_sends_api_key_and_bearer() {
        let (base, server) = serve_once("200 OK", r#"{"success":true,"data":[1,2]}"#).await;
        let body = client_for(base).fetch("/revenue/leads?a=1", 3, Some("tok")).await;
        assert_eq!(body, Some(json!({"success": true, "data": [1, 2]})));

        let head = server.await.unwrap();
        assert!(head.starts_with("get /revenue/leads?a=1&centro_id=3 http/1.1"), "{head}");
        assert!(head.contains("x-api-key: k1"), "{head}");
        assert!(head.contains("authorization: bearer tok"), "{head}");
    }

    #[tokio::test]
    async fn test_fetch_without_token_omits_authorization() {
        let (base, server) = serve_once("200 OK", "{}").await;
        assert!(client_for(base).fetch("/bi/kpi", 3, None).await.is_some());

        let head = server.await.unwrap();
        assert!(head.contains("x-api-key: k1"), "{head}");
        assert!(!head.contains("authorization:"), "{head}");
    }

    #[tokio::test]
    async fn test_empty_token_is_not_forwarded() {
        let (base, server) = serve_once("200 OK", "{}").await;
        assert!(client_for(base).fetch("/bi/kpi", 3, Some("")).await.is_some());
        assert!(!server.await.unwrap().contains("authorization:"));
    }

    #[tokio::test]
    async fn test_non_success_status_yields_none() {
        let (base, server) =
            serve_once("500 Internal Server Error", r#"{"error":"boom"}"#).await;
        assert!(client_for(base).fetch("/revenue/quotes", 3, Some("tok")).await.is_none());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_undecodable_body_yields_none() {
        let (base, server) = serve_once("200 OK", "<html>maintenance</html>").await;
        assert!(client_for(base).fetch("/revenue/quotes", 3, None).await.is_none());
        server.await.unwrap();
    }

    #[test]
    fn test_build_url_without_query() {
        assert_eq!(
            build_url("https://analytics.local/api/v1", "/revenue/leads", 12),
            "https://analytics.local/api/v1/revenue/leads?centro_id=12"
        );
    }

    #[test]
    fn test_build_url_with_existing_query() {
        assert_eq!(
            build_url("https://analytics.local/api/v1/", "/bi/stats?periodo=mese", 3),
            "https://analytics.local/api/v1/bi/stats?periodo=mese&centro_id=3"
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_yields_none() {
        let client = UpstreamClient::new(&UpstreamConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            api_key: "key".to_string(),
            timeout_ms: 500,
        })
        .unwrap();
        assert!(client.fetch("/revenue/leads", 1, Some("tok")).await.is_none());
    }
}
