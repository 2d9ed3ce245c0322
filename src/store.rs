//! Response store: the single source of truth for survey answers
//!
//! Both the UI handlers and the agent's tool calls write here. The handle is
//! cheap to clone and every clone sees the same answers, so a reader built
//! long before a mutation still observes it on its next read.

use crate::survey::{Catalog, Question, QuestionKind};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tokio::sync::watch;

/// Which input channel performed a mutation (for logging only; last write wins)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Ui,
    Agent,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Ui => f.write_str("ui"),
            Channel::Agent => f.write_str("agent"),
        }
    }
}

/// Rejections produced by the store boundary validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnswerError {
    #[error("\"{value}\" is not one of the options for question {question_id}")]
    NotAnOption { question_id: u32, value: String },
    #[error("question {question_id} is {actual}, not {declared}")]
    KindMismatch {
        question_id: u32,
        declared: &'static str,
        actual: &'static str,
    },
}

struct Inner {
    catalog: Arc<Catalog>,
    answers: RwLock<HashMap<u32, String>>,
    revision: watch::Sender<u64>,
}

/// Shared handle to the answer mapping `question id -> value`.
///
/// Absence of a key means "unanswered". Empty values are never stored.
#[derive(Clone)]
pub struct ResponseStore {
    inner: Arc<Inner>,
}

impl ResponseStore {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                catalog,
                answers: RwLock::new(HashMap::new()),
                revision,
            }),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    pub fn total_questions(&self) -> usize {
        self.inner.catalog.len()
    }

    /// Upsert the answer for `question_id`, returning the value actually stored.
    ///
    /// Multiple-choice answers are normalised to the canonical option text
    /// (case-insensitive match or 1-based option number) and rejected when
    /// they match no option. Ids outside the catalog are stored unchecked.
    /// An empty value clears the question.
    pub fn set(
        &self,
        question_id: u32,
        value: impl Into<String>,
        channel: Channel,
    ) -> Result<String, AnswerError> {
        let value = value.into();
        if value.is_empty() {
            self.clear(question_id, channel);
            return Ok(value);
        }

        let stored = match self.inner.catalog.get(question_id) {
            Some(question) => validate(question, value)?,
            None => {
                tracing::warn!(
                    question_id,
                    channel = %channel,
                    "Storing answer for question outside the catalog"
                );
                value
            }
        };

        self.write().insert(question_id, stored.clone());
        tracing::info!(
            question_id,
            channel = %channel,
            chars = stored.chars().count(),
            completed = self.completion_count(),
            total = self.total_questions(),
            "Answer recorded"
        );
        if self.is_complete() {
            tracing::info!("Every survey question is answered");
        }
        self.bump_revision();
        Ok(stored)
    }

    /// Mark a question unanswered.
    pub fn clear(&self, question_id: u32, channel: Channel) {
        let removed = self.write().remove(&question_id).is_some();
        if removed {
            tracing::info!(
                question_id,
                channel = %channel,
                completed = self.completion_count(),
                "Answer cleared"
            );
            self.bump_revision();
        }
    }

    /// Current answer, or `None` when unanswered.
    pub fn get(&self, question_id: u32) -> Option<String> {
        self.read().get(&question_id).cloned()
    }

    /// Number of catalog questions holding a non-empty answer.
    pub fn completion_count(&self) -> usize {
        let answers = self.read();
        self.inner
            .catalog
            .questions()
            .iter()
            .filter(|q| answers.get(&q.id).is_some_and(|a| !a.is_empty()))
            .count()
    }

    pub fn is_complete(&self) -> bool {
        self.completion_count() == self.total_questions()
    }

    /// Copy of the current mapping, for projections.
    pub fn snapshot(&self) -> HashMap<u32, String> {
        self.read().clone()
    }

    /// Check a caller-declared question kind against the catalog.
    ///
    /// Unknown ids pass: there is nothing to compare against.
    pub fn check_kind(&self, question_id: u32, declared: QuestionKind) -> Result<(), AnswerError> {
        match self.inner.catalog.get(question_id) {
            Some(q) if q.kind != declared => Err(AnswerError::KindMismatch {
                question_id,
                declared: declared.as_str(),
                actual: q.kind.as_str(),
            }),
            _ => Ok(()),
        }
    }

    /// Receiver that changes every time the answers change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    fn bump_revision(&self) {
        self.inner.revision.send_modify(|r| *r += 1);
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<u32, String>> {
        self.inner
            .answers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<u32, String>> {
        self.inner
            .answers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn validate(question: &Question, value: String) -> Result<String, AnswerError> {
    match question.kind {
        QuestionKind::LongText => Ok(value),
        QuestionKind::MultipleChoice => {
            canonical_option(question, &value).ok_or(AnswerError::NotAnOption {
                question_id: question.id,
                value,
            })
        }
    }
}

/// Resolve a multiple-choice answer to the option string it refers to.
fn canonical_option(question: &Question, value: &str) -> Option<String> {
    if let Some(exact) = question.options.iter().find(|o| o.as_str() == value) {
        return Some(exact.clone());
    }

    let wanted = value.trim().to_lowercase();
    if let Some(loose) = question
        .options
        .iter()
        .find(|o| o.trim().to_lowercase() == wanted)
    {
        return Some(loose.clone());
    }

    wanted
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| question.options.get(i))
        .cloned()
}
