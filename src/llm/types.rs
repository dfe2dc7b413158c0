//! Request and response types for the OpenAI-compatible chat completions
//! endpoint exposed by Groq.
//!
//! All structs derive `Serialize` and `Deserialize` for JSON conversion in
//! the shape expected by `v1/chat/completions`.

use serde::{Deserialize, Serialize};

/// Request body for the `/chat/completions` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model identifier (e.g. "llama3-70b-8192").
    pub model: String,
    /// Conversation so far, usually one system and one user message.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature; 0.0 for deterministic analysis output.
    pub temperature: f32,
    /// Maximum number of tokens in the generated reply.
    pub max_tokens: u32,
}

/// A single message in a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Sender role: "system", "user" or "assistant".
    pub role: String,
    /// Textual content of the message.
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// Response returned by the `/chat/completions` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Unique response identifier assigned by the API.
    pub id: String,
    /// Model that produced the response.
    pub model: String,
    /// Generated completions; one choice unless `n > 1` was requested.
    pub choices: Vec<Choice>,
    /// Token accounting for the call.
    #[serde(default)]
    pub usage: Usage,
}

impl ChatResponse {
    /// Text of the first choice, if any.
    pub fn text(&self) -> Option<&str> {
        self.choices.first().map(|c| c.message.content.as_str())
    }
}

/// One generated completion inside a [`ChatResponse`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    pub index: u32,
    pub message: ChatMessage,
    /// Why generation stopped (e.g. "stop", "length"). `None` if still open.
    pub finish_reason: Option<String>,
}

/// Token usage statistics for one API call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}
