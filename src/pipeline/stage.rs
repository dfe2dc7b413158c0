//! Stages and the per-job context they accumulate.
//!
//! A [`Stage`] is pure configuration: an instruction template, an advisory
//! expected-output contract and exactly one assigned agent. Stages are
//! defined once at startup and reused across jobs; the only per-invocation
//! state is the [`StageContext`] handed to them.

use std::collections::HashMap;
use std::sync::Arc;

use crate::agents::Agent;
use crate::llm::{BackendError, ChatMessage, ChatRequest, CompletionSender};

use super::runner::PipelineSettings;

/// Template variables plus accumulated outputs of completed stages for one
/// job, exposed to later stages.
#[derive(Debug, Clone)]
pub struct StageContext {
    vars: HashMap<String, String>,
    outputs: Vec<(String, String)>,
}

impl StageContext {
    pub fn new(query: &str, report_text: &str) -> Self {
        Self {
            vars: HashMap::from([
                ("query".to_string(), query.to_string()),
                ("report_text".to_string(), report_text.to_string()),
            ]),
            outputs: Vec::new(),
        }
    }

    /// Record a completed stage's output, making it available both as a
    /// template variable and in the prompt transcript of later stages.
    pub fn push_output(&mut self, stage: &str, output: String) {
        self.vars.insert(stage.to_string(), output.clone());
        self.outputs.push((stage.to_string(), output));
    }

    pub fn output(&self, stage: &str) -> Option<&str> {
        self.outputs
            .iter()
            .find(|(name, _)| name == stage)
            .map(|(_, out)| out.as_str())
    }

    /// Stage outputs in execution order.
    pub fn outputs(&self) -> &[(String, String)] {
        &self.outputs
    }

    pub fn into_outputs(self) -> Vec<(String, String)> {
        self.outputs
    }

    /// Substitute `{name}` placeholders against the current variables.
    /// Unknown placeholders are left untouched.
    pub fn render(&self, template: &str) -> String {
        let mut rendered = template.to_string();
        for (key, value) in &self.vars {
            let placeholder = format!("{{{key}}}");
            if rendered.contains(&placeholder) {
                rendered = rendered.replace(&placeholder, value);
            }
        }
        rendered
    }

    /// Prior stage outputs formatted for inclusion in a prompt, or `None`
    /// when no stage has completed yet.
    fn transcript(&self) -> Option<String> {
        if self.outputs.is_empty() {
            return None;
        }
        let mut text = String::from("Findings from earlier analysis stages:\n");
        for (stage, output) in &self.outputs {
            text.push_str(&format!("\n[{stage}]\n{output}\n"));
        }
        Some(text)
    }
}

/// One unit of pipeline work bound to a single reasoning role.
pub struct Stage {
    /// Key under which the stage's output lands in the aggregated result.
    pub name: String,
    /// Instruction template over `{query}`, `{report_text}` and earlier
    /// stage names.
    pub description: String,
    /// Advisory shape for the output; included in the request so the backend
    /// can format its answer, never machine-validated.
    pub expected_output: String,
    pub agent: Arc<Agent>,
    /// Gate stages validate the input document; their output may begin with
    /// the `INVALID` sentinel.
    pub gate: bool,
}

impl Stage {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        expected_output: impl Into<String>,
        agent: Arc<Agent>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            expected_output: expected_output.into(),
            agent,
            gate: false,
        }
    }

    pub fn gate(mut self) -> Self {
        self.gate = true;
        self
    }

    /// Build the fully-instantiated backend request for this stage.
    pub fn request(&self, settings: &PipelineSettings, ctx: &StageContext) -> ChatRequest {
        let system = format!(
            "You are {role}. {backstory}\n\nYour goal: {goal}",
            role = self.agent.role,
            backstory = self.agent.backstory,
            goal = ctx.render(&self.agent.goal),
        );

        let mut user = ctx.render(&self.description);
        if let Some(transcript) = ctx.transcript() {
            user.push_str("\n\n");
            user.push_str(&transcript);
        }
        user.push_str("\n\nExpected output:\n");
        user.push_str(&self.expected_output);

        ChatRequest {
            model: settings.model.clone(),
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        }
    }

    /// Instantiate the stage against the context and dispatch it through the
    /// assigned agent.
    pub async fn invoke(
        &self,
        client: &impl CompletionSender,
        settings: &PipelineSettings,
        ctx: &StageContext,
    ) -> Result<String, BackendError> {
        let req = self.request(settings, ctx);
        self.agent.call(client, &req, settings.stage_timeout).await
    }
}
