//! Sequential pipeline execution.
//!
//! A [`Pipeline`] runs its stages strictly in order: each stage's output is
//! added to the context before the next stage starts, and the first failure
//! aborts the remainder with the failing stage's identity attached. The
//! aggregated result keeps every stage's output keyed by stage name.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::llm::{BackendError, CompletionSender};

use super::stage::{Stage, StageContext};

/// Sentinel prefix a gate stage emits when the document is not of the
/// expected kind.
pub const INVALID_SENTINEL: &str = "INVALID";

/// What to do when a gate stage reports an invalid document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatePolicy {
    /// Run the remaining stages anyway; the verdict is still surfaced in the
    /// aggregated result.
    Continue,
    /// Stop after the gate; the job completes with only the gate's verdict.
    Halt,
}

/// Knobs shared by every stage invocation of one pipeline.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Per-stage deadline; expiry fails the stage with a timeout error.
    pub stage_timeout: Duration,
    pub gate_policy: GatePolicy,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("stage '{stage}' failed: {source}")]
    Stage {
        stage: String,
        #[source]
        source: BackendError,
    },
}

/// Aggregated outcome of a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Every stage output that ran, in execution order.
    pub outputs: Vec<(String, String)>,
    /// Gate verdict; `None` when the pipeline has no gate stage.
    pub document_valid: Option<bool>,
}

impl PipelineReport {
    /// JSON object keyed by stage name, plus the gate verdict when present.
    pub fn into_value(self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (stage, output) in self.outputs {
            map.insert(stage, serde_json::Value::String(output));
        }
        if let Some(valid) = self.document_valid {
            map.insert("document_valid".to_string(), serde_json::Value::Bool(valid));
        }
        serde_json::Value::Object(map)
    }
}

/// Fixed ordered sequence of stages bound to one backend client.
///
/// Immutable after construction and freely shared across concurrent jobs.
pub struct Pipeline<C> {
    client: Arc<C>,
    stages: Vec<Stage>,
    settings: PipelineSettings,
}

impl<C: CompletionSender + Send + Sync> Pipeline<C> {
    pub fn new(client: Arc<C>, stages: Vec<Stage>, settings: PipelineSettings) -> Self {
        Self {
            client,
            stages,
            settings,
        }
    }

    /// Run every stage in order against a fresh context.
    ///
    /// A stage failure aborts the run immediately; stages after the failing
    /// one never execute and none of their output appears anywhere.
    pub async fn run(
        &self,
        query: &str,
        report_text: &str,
    ) -> Result<PipelineReport, PipelineError> {
        let mut ctx = StageContext::new(query, report_text);
        let mut document_valid = None;

        for stage in &self.stages {
            tracing::info!(stage = %stage.name, agent = %stage.agent.role, "running stage");
            let output = stage
                .invoke(self.client.as_ref(), &self.settings, &ctx)
                .await
                .map_err(|source| PipelineError::Stage {
                    stage: stage.name.clone(),
                    source,
                })?;

            let halt_here = stage.gate && {
                let valid = !output.trim_start().starts_with(INVALID_SENTINEL);
                document_valid = Some(valid);
                !valid && self.settings.gate_policy == GatePolicy::Halt
            };

            ctx.push_output(&stage.name, output);

            if halt_here {
                tracing::warn!(
                    stage = %stage.name,
                    "gate reported an invalid document, halting pipeline"
                );
                break;
            }
        }

        Ok(PipelineReport {
            outputs: ctx.into_outputs(),
            document_valid,
        })
    }
}
