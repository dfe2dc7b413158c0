use std::time::Duration;

use reqwest::Client;

use super::error::BackendError;
use super::types::{ChatRequest, ChatResponse};

const API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Abstraction over the reasoning backend so pipeline code can be tested
/// against in-process mocks.
pub trait CompletionSender {
    fn complete(
        &self,
        req: &ChatRequest,
    ) -> impl Future<Output = Result<ChatResponse, BackendError>> + Send;
}

/// HTTP client for the Groq chat completions API.
pub struct GroqClient {
    api_key: String,
    client: Client,
    base_url: String,
}

impl GroqClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, API_URL.to_string())
    }

    /// Create a client pointing at a custom base URL (useful for testing).
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()
            .expect("failed to build HTTP client");
        Self {
            api_key,
            client,
            base_url,
        }
    }
}

impl CompletionSender for GroqClient {
    async fn complete(&self, req: &ChatRequest) -> Result<ChatResponse, BackendError> {
        let response = match self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(req)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) if e.is_timeout() => return Err(BackendError::Timeout),
            Err(e) => return Err(e.into()),
        };

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs * 1000)
                .unwrap_or(1000);
            return Err(BackendError::RateLimited {
                retry_after_ms: retry_after,
            });
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(BackendError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response
            .json::<ChatResponse>()
            .await
            .map_err(|e| BackendError::Malformed(e.to_string()))?;

        if body.choices.is_empty() {
            return Err(BackendError::Malformed("response has no choices".into()));
        }

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::ChatMessage;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> ChatRequest {
        ChatRequest {
            model: "llama3-70b-8192".into(),
            messages: vec![ChatMessage::user("Summarise this report")],
            temperature: 0.0,
            max_tokens: 2048,
        }
    }

    fn completion_json(text: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-test",
            "model": "llama3-70b-8192",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": text},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 1, "completion_tokens": 1, "total_tokens": 2}
        })
    }

    #[tokio::test]
    async fn successful_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_json("All good")))
            .mount(&server)
            .await;

        let client = GroqClient::with_base_url(
            "sk-test".into(),
            format!("{}/chat/completions", server.uri()),
        );
        let resp = client.complete(&request()).await.unwrap();
        assert_eq!(resp.text(), Some("All good"));
    }

    #[tokio::test]
    async fn rate_limit_maps_to_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "3"))
            .mount(&server)
            .await;

        let client = GroqClient::with_base_url("sk-test".into(), server.uri());
        let err = client.complete(&request()).await.unwrap_err();
        match err {
            BackendError::RateLimited { retry_after_ms } => assert_eq!(retry_after_ms, 3000),
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn api_error_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = GroqClient::with_base_url("sk-test".into(), server.uri());
        let err = client.complete(&request()).await.unwrap_err();
        match err {
            BackendError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("expected Api, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_choices_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "chatcmpl-empty",
                "model": "llama3-70b-8192",
                "choices": []
            })))
            .mount(&server)
            .await;

        let client = GroqClient::with_base_url("sk-test".into(), server.uri());
        let err = client.complete(&request()).await.unwrap_err();
        assert!(matches!(err, BackendError::Malformed(_)));
    }
}
