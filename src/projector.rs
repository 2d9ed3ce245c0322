//! Status and briefing projections of the response store
//!
//! Both are pure functions of a catalog and an answer snapshot. Callers take
//! a fresh snapshot every time; nothing here is cached.

use crate::survey::{Catalog, QuestionKind};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;

/// Base briefing establishing the agent's role
const ROLE_PROMPT: &str = r"You are a voice based professional GenAI Impact Survey Assistant that drives the conversation forward and STAYS STRICTLY ON TOPIC. Your role is to help users complete this survey about Generative AI impact in government work by having a conversation with them and recording their answers.

STAY ON TOPIC:
- You ONLY discuss the survey questions and responses.
- If users try to discuss other topics, politely redirect them: I'm here specifically to help with the GenAI Impact Survey. Let's focus on completing your responses to the survey questions.
- Do NOT provide general AI assistance, jokes, or discussion unrelated to the survey.

DYNAMIC SURVEY STATUS:
- Always call getSurveyStatus for the current answers. Users can change answers in the form at any time, so the progress section below may already be out of date.";

const WORKFLOW_PROMPT: &str = r"FORM-BASED INTERACTION:
- Users can answer any question at any time; there is no current question.
- Multiple choice questions are answered with the buttons in the form. Do NOT ask for the answer by voice and do NOT record it with recordSurveyAnswer; point the user to the buttons instead.
- Long-text questions can be typed or spoken. When the user speaks about one, save the answer with recordSurveyAnswer using its questionId and questionType long-text.
- If the user already typed something, ask whether to add to it or replace it.
- If an answer is very brief, ask at most one or two follow-up questions, then record it.

RESPONSE STYLE:
- You are a voice assistant: use full sentences, proper punctuation and a natural tone.
- Keep the conversation moving: recommend the next unanswered question and offer to ask it.
- Be conversational but professional and thank users for their responses.
- When everything is answered, tell the user they can review or change any answer in the form or by speaking to you, and that they end the conversation with the Stop Voice Assistant button.";

/// Per-question entry of a status snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionStatus {
    pub question_id: u32,
    pub question: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub answered: bool,
    pub answer: Option<String>,
}

/// Snapshot returned by `getSurveyStatus`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyStatus {
    pub total_questions: usize,
    pub completed_questions: usize,
    pub is_complete: bool,
    /// Every stored answer, ordered by question id
    pub responses: BTreeMap<u32, String>,
    pub questions_status: Vec<QuestionStatus>,
}

impl SurveyStatus {
    /// First catalog question still waiting for an answer
    pub fn next_open(&self) -> Option<&QuestionStatus> {
        self.questions_status.iter().find(|q| !q.answered)
    }
}

/// Compute the status snapshot for the given answers.
pub fn survey_status(catalog: &Catalog, responses: &HashMap<u32, String>) -> SurveyStatus {
    let questions_status: Vec<QuestionStatus> = catalog
        .questions()
        .iter()
        .map(|q| {
            let answer = responses.get(&q.id).filter(|a| !a.is_empty()).cloned();
            QuestionStatus {
                question_id: q.id,
                question: q.text.clone(),
                kind: q.kind,
                answered: answer.is_some(),
                answer,
            }
        })
        .collect();

    let completed_questions = questions_status.iter().filter(|q| q.answered).count();

    SurveyStatus {
        total_questions: catalog.len(),
        completed_questions,
        is_complete: completed_questions == catalog.len(),
        responses: responses
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (*k, v.clone()))
            .collect(),
        questions_status,
    }
}

/// Build the agent briefing for the given answers.
///
/// The progress section depends on which questions are still open, so the
/// briefing has to be rebuilt whenever the answers change.
pub fn build_briefing(catalog: &Catalog, responses: &HashMap<u32, String>) -> String {
    let status = survey_status(catalog, responses);
    let mut prompt = String::from(ROLE_PROMPT);

    prompt.push_str("\n\nALL QUESTIONS:\n");
    for (i, question) in catalog.questions().iter().enumerate() {
        let _ = write!(
            prompt,
            "\nQuestion {} (ID: {}): \"{}\"\nType: {}\n",
            i + 1,
            question.id,
            question.text,
            question.kind.as_str()
        );
        if question.kind == QuestionKind::MultipleChoice {
            let options = question
                .options
                .iter()
                .enumerate()
                .map(|(j, opt)| format!("{}. {opt}", j + 1))
                .collect::<Vec<_>>()
                .join("; ");
            let _ = writeln!(prompt, "Options: {options}");
            prompt.push_str("How to answer: UI buttons only\n");
        } else {
            let _ = writeln!(
                prompt,
                "How to answer: typing or voice (recordSurveyAnswer with questionId: {}, questionType: \"long-text\")",
                question.id
            );
        }
    }

    let _ = write!(
        prompt,
        "\nPROGRESS WHEN THIS BRIEFING WAS BUILT: {} of {} answered\n",
        status.completed_questions, status.total_questions
    );
    for (i, q) in status.questions_status.iter().enumerate() {
        let mark = if q.answered { "answered" } else { "open" };
        let _ = writeln!(prompt, "- Question {} (ID: {}): {mark}", i + 1, q.question_id);
    }

    prompt.push_str("\nGREETING (say this as soon as you connect):\n");
    let _ = writeln!(
        prompt,
        "Hello! I'm here to help you complete the GenAI Impact Survey. You have {} questions to work with, and you can answer them in any order. For multiple choice questions, use the buttons. For the detailed questions, you can either type directly in the text areas or speak to me and I'll fill them out for you. Let me check your current progress.",
        status.total_questions
    );

    match status.next_open() {
        Some(next) => {
            let position = status
                .questions_status
                .iter()
                .position(|q| q.question_id == next.question_id)
                .map_or(0, |p| p + 1);
            let _ = writeln!(
                prompt,
                "Then call getSurveyStatus and, if it confirms, start with Question {position} (ID: {}), the first unanswered question.",
                next.question_id
            );
        }
        None => {
            prompt.push_str(
                "Then call getSurveyStatus. If every question is still answered, thank the user and offer to review or refine their answers.\n",
            );
        }
    }

    prompt.push('\n');
    prompt.push_str(WORKFLOW_PROMPT);
    prompt
}
