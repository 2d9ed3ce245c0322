//! Tools exposed to the conversational agent
//!
//! Tools are stateless singletons. Everything a call needs arrives in its
//! `ToolContext`, which holds a live store handle rather than a copy of the
//! answers, so a long-lived agent always acts on the current state.

mod record_answer;
mod survey_status;

pub use record_answer::RecordAnswerTool;
pub use survey_status::SurveyStatusTool;

use crate::store::ResponseStore;
use crate::voice::SessionGuard;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Result from tool execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_data: Option<Value>,
}

impl ToolOutput {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            display_data: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            output: message.into(),
            display_data: None,
        }
    }

    pub fn with_display(mut self, data: Value) -> Self {
        self.display_data = Some(data);
        self
    }
}

/// Tool description handed to the agent configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// All context needed for a tool invocation.
#[derive(Clone)]
pub struct ToolContext {
    /// Live handle to the answers
    pub store: ResponseStore,

    /// Session generation the call was issued under
    pub session: SessionGuard,
}

impl ToolContext {
    pub fn new(store: ResponseStore, session: SessionGuard) -> Self {
        Self { store, session }
    }
}

/// Trait for tools that can be executed by the agent
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name
    fn name(&self) -> &str;

    /// Tool description for the agent
    fn description(&self) -> String;

    /// JSON schema for tool input
    fn input_schema(&self) -> Value;

    /// Execute the tool with all context provided via `ToolContext`
    async fn run(&self, input: Value, ctx: ToolContext) -> ToolOutput;
}

/// Collection of tools available to the agent
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// The survey tool set: record an answer, read the status
    pub fn survey() -> Self {
        Self {
            tools: vec![Arc::new(RecordAnswerTool), Arc::new(SurveyStatusTool)],
        }
    }

    /// Get all tool definitions for the agent
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description(),
                input_schema: t.input_schema(),
            })
            .collect()
    }

    /// Execute a tool by name with context.
    ///
    /// Calls issued under a session that has since been closed or replaced
    /// are discarded without touching the store.
    pub async fn execute(&self, name: &str, input: Value, ctx: ToolContext) -> Option<ToolOutput> {
        let tool = self.tools.iter().find(|t| t.name() == name)?;

        if !ctx.session.is_current() {
            tracing::warn!(
                tool = name,
                generation = ctx.session.generation(),
                "Discarding tool call from a stale voice session"
            );
            return Some(ToolOutput::error(
                "The voice session that issued this call has ended; nothing was changed.",
            ));
        }

        let output = tool.run(input, ctx).await;
        tracing::debug!(tool = name, success = output.success, "Tool call finished");
        Some(output)
    }
}
