//! Reasoning-role configuration.
//!
//! An [`Agent`] is a named role bound to the shared reasoning backend: a goal
//! template, a backstory and capability limits. Agents are built once at
//! startup and shared read-only across all concurrent jobs; the only interior
//! state is the call-rate limiter, which is enforced before every dispatch.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};

use crate::llm::{BackendError, ChatRequest, CompletionSender};

/// Configuration for retry behavior within one stage invocation.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Base delay in milliseconds for exponential backoff.
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { base_delay_ms: 1000 }
    }
}

impl RetryConfig {
    /// Calculate the delay for a given retry attempt using exponential backoff.
    /// delay = base_delay_ms * 2^(attempt - 1)
    pub fn delay_for_attempt(&self, attempt: u32) -> u64 {
        self.base_delay_ms * 2u64.pow(attempt.saturating_sub(1))
    }
}

/// Per-agent capability limits, enforced before dispatch.
#[derive(Debug, Clone, Copy)]
pub struct AgentLimits {
    /// Maximum backend attempts for one invocation before the failure is
    /// surfaced to the pipeline.
    pub max_iterations: u32,
    /// Maximum backend calls per minute across all concurrent jobs.
    pub max_calls_per_minute: u32,
}

impl Default for AgentLimits {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            max_calls_per_minute: 3,
        }
    }
}

/// Sliding-window call-rate limiter.
///
/// Keeps timestamps of calls made in the last minute; when the window is
/// full, `acquire` sleeps until the oldest call falls out of it.
struct RateLimiter {
    max_per_minute: u32,
    stamps: Mutex<VecDeque<Instant>>,
}

const WINDOW: Duration = Duration::from_secs(60);

impl RateLimiter {
    fn new(max_per_minute: u32) -> Self {
        Self {
            max_per_minute: max_per_minute.max(1),
            stamps: Mutex::new(VecDeque::new()),
        }
    }

    async fn acquire(&self) {
        loop {
            let now = Instant::now();
            let mut stamps = self.stamps.lock().await;
            while stamps.front().is_some_and(|t| now - *t >= WINDOW) {
                stamps.pop_front();
            }
            if stamps.len() < self.max_per_minute as usize {
                stamps.push_back(now);
                return;
            }
            // Window is full; wait until the oldest stamp expires.
            let wait = WINDOW - (now - *stamps.front().expect("window is full"));
            drop(stamps);
            sleep(wait).await;
        }
    }
}

/// A named reasoning role shared across jobs.
pub struct Agent {
    /// Human-readable identity, e.g. "Internal Medicine Physician".
    pub role: String,
    /// Parameterized objective, instantiated with per-job variables.
    pub goal: String,
    /// Background context included in the system prompt.
    pub backstory: String,
    pub limits: AgentLimits,
    pub retry: RetryConfig,
    limiter: RateLimiter,
}

impl Agent {
    pub fn new(
        role: impl Into<String>,
        goal: impl Into<String>,
        backstory: impl Into<String>,
        limits: AgentLimits,
    ) -> Self {
        Self {
            role: role.into(),
            goal: goal.into(),
            backstory: backstory.into(),
            limits,
            retry: RetryConfig::default(),
            limiter: RateLimiter::new(limits.max_calls_per_minute),
        }
    }

    /// Dispatch one fully-instantiated request to the backend, honoring the
    /// agent's rate limit, per-call timeout and bounded attempt budget.
    ///
    /// Retries transient failures (rate limit, timeout, network) up to
    /// `limits.max_iterations` attempts; non-retryable errors surface
    /// immediately.
    pub async fn call(
        &self,
        client: &impl CompletionSender,
        req: &ChatRequest,
        timeout: Duration,
    ) -> Result<String, BackendError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            self.limiter.acquire().await;

            let err = match tokio::time::timeout(timeout, client.complete(req)).await {
                Ok(Ok(resp)) => match resp.text() {
                    Some(text) => return Ok(text.to_string()),
                    None => BackendError::Malformed("completion has no text".into()),
                },
                Ok(Err(e)) => e,
                Err(_) => BackendError::Timeout,
            };

            if attempt >= self.limits.max_iterations || !err.is_retryable() {
                return Err(err);
            }

            let delay_ms = match &err {
                BackendError::RateLimited { retry_after_ms } => *retry_after_ms,
                _ => self.retry.delay_for_attempt(attempt),
            };
            tracing::warn!(
                agent = %self.role,
                attempt,
                max_attempts = self.limits.max_iterations,
                error = %err,
                delay_ms,
                "backend call failed, retrying"
            );
            sleep(Duration::from_millis(delay_ms)).await;
        }
    }
}
