pub mod client;
pub mod error;
pub mod types;

pub use client::{CompletionSender, GroqClient};
pub use error::BackendError;
pub use types::{ChatMessage, ChatRequest, ChatResponse, Choice, Usage};
