//! The transcript data model: messages strictly alternating between the
//! user and assistant roles, each carrying a list of content items.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The role a message was produced by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One piece of content inside a message.
///
/// `ToolUse.id` is unique within a transcript. Every `ToolResult` references
/// exactly one prior `ToolUse.id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentItem {
    Text { text: String },
    ToolUse { id: String, name: String, input: Value },
    ToolResult { tool_use_id: String, content: String },
}

impl ContentItem {
    pub fn text(text: impl Into<String>) -> Self {
        ContentItem::Text { text: text.into() }
    }

    pub fn tool_use(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        ContentItem::ToolUse {
            id: id.into(),
            name: name.into(),
            input,
        }
    }

    pub fn tool_result(tool_use_id: impl Into<String>, content: impl Into<String>) -> Self {
        ContentItem::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: content.into(),
        }
    }

    pub fn as_tool_use_id(&self) -> Option<&str> {
        match self {
            ContentItem::ToolUse { id, .. } => Some(id),
            _ => None,
        }
    }
}

/// A single message in the transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentItem>,
}

impl Message {
    pub fn user(content: Vec<ContentItem>) -> Self {
        Self {
            role: Role::User,
            content,
        }
    }

    pub fn assistant(content: Vec<ContentItem>) -> Self {
        Self {
            role: Role::Assistant,
            content,
        }
    }

    /// All `tool_use` content items in this message, in order.
    pub fn tool_uses(&self) -> impl Iterator<Item = (&str, &str, &Value)> {
        self.content.iter().filter_map(|item| match item {
            ContentItem::ToolUse { id, name, input } => Some((id.as_str(), name.as_str(), input)),
            _ => None,
        })
    }

    pub fn has_tool_uses(&self) -> bool {
        self.content
            .iter()
            .any(|item| matches!(item, ContentItem::ToolUse { .. }))
    }
}

/// Verify the message-alternation invariant: a run of one or more
/// consecutive assistant messages each carrying a single `tool_use` item
/// must be immediately followed by one user message carrying exactly one
/// matching `tool_result` per `tool_use`, in the same order the `tool_use`
/// items appeared. A Runner emits one assistant message per tool request and
/// a single combined user message with all results, so the invariant spans
/// that whole run rather than pairing message-by-message.
pub fn check_alternation(messages: &[Message]) -> Result<(), String> {
    let mut i = 0;
    while i < messages.len() {
        let msg = &messages[i];
        if msg.role == Role::Assistant && msg.has_tool_uses() {
            let mut expected_ids: Vec<&str> = Vec::new();
            let mut j = i;
            while j < messages.len() && messages[j].role == Role::Assistant && messages[j].has_tool_uses() {
                expected_ids.extend(messages[j].tool_uses().map(|(id, _, _)| id));
                j += 1;
            }
            let next = messages.get(j).ok_or_else(|| {
                format!(
                    "assistant message(s) ending at index {} have tool_use items but no following message",
                    j - 1
                )
            })?;
            if next.role != Role::User {
                return Err(format!(
                    "assistant message(s) ending at index {} with tool_use must be followed by a user message",
                    j - 1
                ));
            }
            let actual_ids: Vec<&str> = next
                .content
                .iter()
                .filter_map(|item| match item {
                    ContentItem::ToolResult { tool_use_id, .. } => Some(tool_use_id.as_str()),
                    _ => None,
                })
                .collect();
            if actual_ids != expected_ids {
                return Err(format!(
                    "tool_result ids {actual_ids:?} at index {j} do not match tool_use ids {expected_ids:?} in assistant run ending at index {}",
                    j - 1
                ));
            }
            i = j;
            continue;
        }
        i += 1;
    }
    Ok(())
}

/// Merge newly arrived tool results into the transcript. If the transcript
/// already ends with a user message (a partial aggregate left over from a
/// suspended iteration that resolved some but not all pending `tool_use`
/// items in-loop), the new results extend it; otherwise a fresh user
/// message is appended. A no-op when `results` is empty.
pub fn merge_tool_results(messages: &mut Vec<Message>, results: Vec<(String, String)>) {
    if results.is_empty() {
        return;
    }
    let items: Vec<ContentItem> = results
        .into_iter()
        .map(|(id, content)| ContentItem::tool_result(id, content))
        .collect();
    match messages.last_mut() {
        Some(last) if last.role == Role::User => last.content.extend(items),
        _ => messages.push(Message::user(items)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_extends_trailing_user_message() {
        let mut messages = vec![
            Message::assistant(vec![ContentItem::tool_use("t1", "x", Value::Null)]),
            Message::user(vec![ContentItem::tool_result("t1", "partial")]),
        ];
        merge_tool_results(&mut messages, vec![("t2".to_string(), "done".to_string())]);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].content.len(), 2);
    }

    #[test]
    fn merge_creates_new_user_message_when_none_trailing() {
        let mut messages = vec![Message::assistant(vec![ContentItem::tool_use(
            "t1",
            "x",
            Value::Null,
        )])];
        merge_tool_results(&mut messages, vec![("t1".to_string(), "4".to_string())]);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, Role::User);
    }

    #[test]
    fn alternation_holds_for_matched_pair() {
        let messages = vec![
            Message::user(vec![ContentItem::text("add 2 and 2")]),
            Message::assistant(vec![ContentItem::tool_use(
                "t1",
                "com_calculator_execute",
                serde_json::json!({"expression": "2+2"}),
            )]),
            Message::user(vec![ContentItem::tool_result("t1", "4")]),
        ];
        assert!(check_alternation(&messages).is_ok());
    }

    #[test]
    fn alternation_fails_on_missing_tool_result() {
        let messages = vec![
            Message::assistant(vec![ContentItem::tool_use(
                "t1",
                "x",
                Value::Null,
            )]),
            Message::user(vec![ContentItem::text("oops")]),
        ];
        assert!(check_alternation(&messages).is_err());
    }

    #[test]
    fn alternation_fails_on_out_of_order_results() {
        let messages = vec![
            Message::assistant(vec![
                ContentItem::tool_use("t1", "a", Value::Null),
                ContentItem::tool_use("t2", "b", Value::Null),
            ]),
            Message::user(vec![
                ContentItem::tool_result("t2", "r2"),
                ContentItem::tool_result("t1", "r1"),
            ]),
        ];
        assert!(check_alternation(&messages).is_err());
    }
}
