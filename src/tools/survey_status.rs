//! `getSurveyStatus` - the agent's only view of the answers

use super::{Tool, ToolContext, ToolOutput};
use crate::projector::survey_status;
use async_trait::async_trait;
use serde_json::{json, Value};

/// Reports progress computed from the store at call time
pub struct SurveyStatusTool;

#[async_trait]
impl Tool for SurveyStatusTool {
    fn name(&self) -> &'static str {
        "getSurveyStatus"
    }

    fn description(&self) -> String {
        "Get the current status of the survey including which questions have been answered. Answers can change in the form between turns, so call this instead of relying on earlier results.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn run(&self, _input: Value, ctx: ToolContext) -> ToolOutput {
        let status = survey_status(ctx.store.catalog(), &ctx.store.snapshot());
        tracing::debug!(
            completed = status.completed_questions,
            total = status.total_questions,
            "Survey status requested"
        );

        match serde_json::to_value(&status) {
            Ok(value) => ToolOutput::success(value.to_string()).with_display(value),
            Err(e) => ToolOutput::error(format!("Failed to encode status: {e}")),
        }
    }
}
