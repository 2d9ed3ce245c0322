//! Conversation transcript shown next to the survey
//!
//! Turns arrive from the voice session in order and are only ever appended.
//! Content payloads come in several shapes; `display_text` extracts what the
//! UI should show and never fails.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, PoisonError, RwLock};

/// Shown when a turn's content has no recognisable text yet
pub const PROCESSING_PLACEHOLDER: &str = "Processing voice message...";

/// Who spoke a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// A conversation turn as delivered by the voice session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptItem {
    pub role: Role,
    pub content: Value,
    #[serde(default = "Utc::now")]
    pub received_at: DateTime<Utc>,
}

impl TranscriptItem {
    pub fn new(role: Role, content: Value) -> Self {
        Self {
            role,
            content,
            received_at: Utc::now(),
        }
    }

    pub fn display_text(&self) -> String {
        display_text(&self.content)
    }
}

/// Extract the text to display from a turn's content payload.
///
/// Strings are used as-is. Arrays yield the first element carrying a
/// `transcript` or `text` field; objects are checked for the same fields.
/// Anything else degrades to [`PROCESSING_PLACEHOLDER`].
pub fn display_text(content: &Value) -> String {
    let extracted = match content {
        Value::String(s) => Some(s.as_str()),
        Value::Array(parts) => parts.iter().find_map(text_field),
        Value::Object(_) => text_field(content),
        _ => None,
    };

    extracted
        .filter(|s| !s.is_empty())
        .map_or_else(|| PROCESSING_PLACEHOLDER.to_string(), str::to_string)
}

fn text_field(part: &Value) -> Option<&str> {
    ["transcript", "text"]
        .iter()
        .filter_map(|key| part.get(key).and_then(Value::as_str))
        .find(|s| !s.is_empty())
}

/// Append-only turn log, reset when a new session is established
#[derive(Clone, Default)]
pub struct TranscriptLog {
    items: Arc<RwLock<Vec<TranscriptItem>>>,
}

impl TranscriptLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, item: TranscriptItem) {
        self.items
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(item);
    }

    pub fn reset(&self) {
        self.items
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn items(&self) -> Vec<TranscriptItem> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.items.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_string() {
        assert_eq!(display_text(&json!("Hello there")), "Hello there");
    }

    #[test]
    fn test_array_prefers_first_transcript_or_text() {
        let content = json!([
            {"type": "input_audio", "audio": null},
            {"type": "input_audio", "transcript": "I use it for drafting"},
            {"type": "text", "text": "ignored"}
        ]);
        assert_eq!(display_text(&content), "I use it for drafting");

        let content = json!([{"type": "output_text", "text": "Great, thanks"}]);
        assert_eq!(display_text(&content), "Great, thanks");
    }

    #[test]
    fn test_object_transcript_then_text() {
        assert_eq!(display_text(&json!({"transcript": "spoken"})), "spoken");
        assert_eq!(display_text(&json!({"text": "typed"})), "typed");
        assert_eq!(
            display_text(&json!({"transcript": "", "text": "fallback"})),
            "fallback"
        );
    }

    #[test]
    fn test_unrecognised_shapes_degrade_to_placeholder() {
        for content in [
            json!(null),
            json!(42),
            json!([]),
            json!([{"audio": "..."}]),
            json!({"transcript": null}),
            json!(""),
        ] {
            assert_eq!(display_text(&content), PROCESSING_PLACEHOLDER, "{content}");
        }
    }

    #[test]
    fn test_log_appends_in_order_and_resets() {
        let log = TranscriptLog::new();
        log.append(TranscriptItem::new(Role::User, json!("first")));
        log.append(TranscriptItem::new(Role::Assistant, json!("second")));

        let items = log.items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].role, Role::User);
        assert_eq!(items[1].display_text(), "second");

        log.reset();
        assert!(log.is_empty());
    }

    #[test]
    fn test_item_deserialises_without_timestamp() {
        let item: TranscriptItem =
            serde_json::from_value(json!({"role": "assistant", "content": "hi"})).unwrap();
        assert_eq!(item.role, Role::Assistant);
        assert_eq!(item.display_text(), "hi");
    }
}
