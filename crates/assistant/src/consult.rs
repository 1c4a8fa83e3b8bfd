//! Inter-agent consultation: another agent asks the CFO a single question.

use crate::completion::{CompletionClient, CompletionMessage};
use crate::prompt::CFO_SYSTEM_PROMPT;
use cfo_core::chat::{ConsultRequest, ConsultResponse};
use cfo_core::{CfoError, CfoResult};
use std::sync::Arc;
use tracing::{info, warn};

pub const CONSULT_DOMAIN: &str = "finance";
pub const CONSULT_CONFIDENCE: f32 = 0.85;
pub const UNAVAILABLE_ANSWER: &str = "CFO data unavailable: the financial assistant could not answer right now.";
pub const UNAVAILABLE_CAVEAT: &str = "CFO assistant error";

pub struct ConsultService {
    completion: Arc<dyn CompletionClient>,
    secret: Option<String>,
}

impl ConsultService {
    pub fn new(completion: Arc<dyn CompletionClient>, secret: Option<String>) -> Self {
        Self {
            completion,
            secret: secret.filter(|s| !s.is_empty()),
        }
    }

    /// Reject unless `presented` matches the configured secret. An
    /// unconfigured secret rejects everyone.
    pub fn authorize(&self, presented: Option<&str>) -> CfoResult<()> {
        match (self.secret.as_deref(), presented) {
            (Some(expected), Some(given)) if expected == given => Ok(()),
            _ => Err(CfoError::Unauthorized("invalid inter-agent secret".to_string())),
        }
    }

    pub async fn consult(
        &self,
        presented_secret: Option<&str>,
        request: ConsultRequest,
    ) -> CfoResult<ConsultResponse> {
        self.authorize(presented_secret)?;

        if request.question.trim().is_empty() {
            return Err(CfoError::InvalidInput("question is required".to_string()));
        }

        metrics::counter!("consult.requests").increment(1);
        let caller = request
            .caller
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or("system");
        let user_content = match request.context.as_deref().filter(|c| !c.is_empty()) {
            Some(context) => {
                format!(
                    "Context provided by {caller}:\n{context}\n\nQuestion: {}",
                    request.question
                )
            }
            None => request.question.clone(),
        };

        let messages = [
            CompletionMessage::system(CFO_SYSTEM_PROMPT),
            CompletionMessage::user(user_content),
        ];

        match self.completion.complete(&messages).await {
            Ok(answer) => {
                info!(caller, "Consultation answered");
                Ok(ConsultResponse {
                    answer,
                    confidence: CONSULT_CONFIDENCE,
                    caveats: Vec::new(),
                    domain: CONSULT_DOMAIN.to_string(),
                })
            }
            Err(e) => {
                warn!(caller, error = %e, "Consultation failed");
                Ok(ConsultResponse {
                    answer: UNAVAILABLE_ANSWER.to_string(),
                    confidence: 0.0,
                    caveats: vec![UNAVAILABLE_CAVEAT.to_string()],
                    domain: CONSULT_DOMAIN.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeCompletion {
        fail: bool,
        calls: Mutex<Vec<Vec<CompletionMessage>>>,
    }

    impl FakeCompletion {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                fail,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CompletionClient for FakeCompletion {
        async fn complete(&self, messages: &[CompletionMessage]) -> CfoResult<String> {
            self.calls.lock().unwrap().push(messages.to_vec());
            if self.fail {
                Err(CfoError::CompletionFailure("quota exceeded".to_string()))
            } else {
                Ok("Cash flow is positive.".to_string())
            }
        }
    }

    fn ask(question: &str) -> ConsultRequest {
        ConsultRequest {
            question: question.to_string(),
            caller: None,
            context: None,
        }
    }

    #[tokio::test]
    async fn test_wrong_secret_never_reaches_completion() {
        let completion = FakeCompletion::new(false);
        let svc = ConsultService::new(completion.clone(), Some("s3cret".into()));

        let err = svc.consult(Some("guess"), ask("Cash?")).await.unwrap_err();
        assert!(matches!(err, CfoError::Unauthorized(_)));
        let err = svc.consult(None, ask("Cash?")).await.unwrap_err();
        assert!(matches!(err, CfoError::Unauthorized(_)));
        assert_eq!(completion.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unconfigured_secret_rejects_everyone() {
        let completion = FakeCompletion::new(false);
        let svc = ConsultService::new(completion.clone(), Some(String::new()));
        let err = svc.consult(Some(""), ask("Cash?")).await.unwrap_err();
        assert!(matches!(err, CfoError::Unauthorized(_)));
        assert_eq!(completion.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_question_is_invalid() {
        let completion = FakeCompletion::new(false);
        let svc = ConsultService::new(completion.clone(), Some("s3cret".into()));
        let err = svc.consult(Some("s3cret"), ask("  ")).await.unwrap_err();
        assert!(matches!(err, CfoError::InvalidInput(_)));
        assert_eq!(completion.call_count(), 0);
    }

    #[tokio::test]
    async fn test_success_with_context() {
        let completion = FakeCompletion::new(false);
        let svc = ConsultService::new(completion.clone(), Some("s3cret".into()));
        let request = ConsultRequest {
            question: "Can we afford a new chair?".into(),
            caller: Some("ops-agent".into()),
            context: Some("Budget review".into()),
        };

        let response = svc.consult(Some("s3cret"), request).await.unwrap();
        assert_eq!(response.answer, "Cash flow is positive.");
        assert_eq!(response.confidence, 0.85);
        assert!(response.caveats.is_empty());
        assert_eq!(response.domain, "finance");

        let calls = completion.calls.lock().unwrap();
        assert_eq!(calls[0].len(), 2);
        assert_eq!(calls[0][0].content, CFO_SYSTEM_PROMPT);
        assert_eq!(
            calls[0][1].content,
            "Context provided by ops-agent:\nBudget review\n\nQuestion: Can we afford a new chair?"
        );
    }

    #[tokio::test]
    async fn test_question_is_forwarded_verbatim() {
        let completion = FakeCompletion::new(false);
        let svc = ConsultService::new(completion.clone(), Some("s3cret".into()));
        svc.consult(Some("s3cret"), ask("  Cash runway?\n")).await.unwrap();

        let calls = completion.calls.lock().unwrap();
        assert_eq!(calls[0][1].content, "  Cash runway?\n");
    }

    #[tokio::test]
    async fn test_completion_failure_degrades_without_leaking_cause() {
        let svc = ConsultService::new(FakeCompletion::new(true), Some("s3cret".into()));
        let response = svc.consult(Some("s3cret"), ask("Cash?")).await.unwrap();
        assert_eq!(response.confidence, 0.0);
        assert_eq!(response.caveats, vec![UNAVAILABLE_CAVEAT.to_string()]);
        assert!(!response.answer.contains("quota"));
        assert_eq!(response.domain, "finance");
    }
}
