//! `recordSurveyAnswer` - the agent's write path into the response store

use super::{Tool, ToolContext, ToolOutput};
use crate::store::Channel;
use crate::survey::QuestionKind;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

/// Records an answer dictated to the agent
pub struct RecordAnswerTool;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordAnswerInput {
    question_id: u32,
    answer: String,
    question_type: QuestionKind,
}

#[async_trait]
impl Tool for RecordAnswerTool {
    fn name(&self) -> &'static str {
        "recordSurveyAnswer"
    }

    fn description(&self) -> String {
        "Record a survey answer for a specific question. Overwrites any answer the user typed or selected earlier.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["questionId", "answer", "questionType"],
            "properties": {
                "questionId": {
                    "type": "integer",
                    "description": "The ID of the question being answered"
                },
                "answer": {
                    "type": "string",
                    "description": "The answer provided by the user"
                },
                "questionType": {
                    "type": "string",
                    "enum": ["multiple-choice", "long-text"],
                    "description": "The type of question being answered"
                }
            }
        })
    }

    async fn run(&self, input: Value, ctx: ToolContext) -> ToolOutput {
        let input: RecordAnswerInput = match serde_json::from_value(input) {
            Ok(i) => i,
            Err(e) => return ToolOutput::error(format!("Invalid input: {e}")),
        };

        if let Err(e) = ctx.store.check_kind(input.question_id, input.question_type) {
            return ToolOutput::error(e.to_string());
        }

        match ctx.store.set(input.question_id, input.answer, Channel::Agent) {
            Ok(stored) => {
                let thanks = match input.question_type {
                    QuestionKind::LongText => "Thank you for the detailed response!",
                    QuestionKind::MultipleChoice => "Great choice!",
                };
                ToolOutput::success(format!(
                    "Answer recorded successfully for question {}. {thanks}",
                    input.question_id
                ))
                .with_display(json!({
                    "questionId": input.question_id,
                    "answer": stored,
                }))
            }
            Err(e) => ToolOutput::error(e.to_string()),
        }
    }
}
