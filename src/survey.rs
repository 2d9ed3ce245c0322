//! Survey question catalog
//!
//! The catalog is fixed for the lifetime of a session. Question ids are the
//! keys of the response store and the `questionId` argument of tool calls.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write;

/// Placeholder used by the copy-all export for unanswered questions
pub const NO_RESPONSE_PLACEHOLDER: &str = "No response provided";

/// How a question is answered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionKind {
    /// One of a fixed list of options, picked with the UI buttons
    MultipleChoice,
    /// Free text, typed or dictated
    LongText,
}

impl QuestionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice => "multiple-choice",
            QuestionKind::LongText => "long-text",
        }
    }
}

/// A single survey question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: u32,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    #[serde(rename = "question")]
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl Question {
    pub fn multiple_choice(
        id: u32,
        text: impl Into<String>,
        options: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            id,
            kind: QuestionKind::MultipleChoice,
            text: text.into(),
            options: options.into_iter().map(Into::into).collect(),
        }
    }

    pub fn long_text(id: u32, text: impl Into<String>) -> Self {
        Self {
            id,
            kind: QuestionKind::LongText,
            text: text.into(),
            options: Vec::new(),
        }
    }
}

/// Ordered, immutable list of survey questions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Catalog {
    questions: Vec<Question>,
}

impl Catalog {
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    /// The GenAI impact follow-up survey: one multiple-choice question
    /// followed by two long-text questions.
    pub fn genai_impact() -> Self {
        Self::new(vec![
            Question::multiple_choice(
                1,
                "How would you describe the impact of being able to use GenAI in your work? Choose the best answer.",
                [
                    "It has fundamentally changed the way I work",
                    "I have been able to achieve notable results and improvements",
                    "It has enhanced my work in meaningful ways",
                    "I have applied some concepts but haven't seen major benefits yet",
                    "I have not been able to apply it in my work",
                ],
            ),
            Question::long_text(
                2,
                "Briefly describe how you use GenAI now. Give an example of a problem that you have solved using GenAI that impacted the citizens you serve. Describe the steps you took to solve that problem. If you aren't using GenAI, please help us understand why not.",
            ),
            Question::long_text(
                3,
                "Do you have any additional feedback or insights to share about your experience applying GenAI?",
            ),
        ])
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn get(&self, id: u32) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Render every question and its current answer as one flat text block,
/// for the "copy all responses" action.
pub fn format_responses(catalog: &Catalog, responses: &HashMap<u32, String>) -> String {
    let mut out = String::new();
    for (i, question) in catalog.questions().iter().enumerate() {
        let answer = responses
            .get(&question.id)
            .map(String::as_str)
            .filter(|a| !a.is_empty())
            .unwrap_or(NO_RESPONSE_PLACEHOLDER);
        let _ = write!(
            out,
            "Question {}: {}\n\nResponse: {answer}\n\n---\n\n",
            i + 1,
            question.text
        );
    }
    out
}
