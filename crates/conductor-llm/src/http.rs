//! A generic, provider-agnostic HTTP chat adapter. Speaks a minimal
//! OpenAI-shaped `{messages, tools, tool_calls}` wire format over `reqwest`.
//! Deliberately NOT bound to any named vendor's API — concrete provider
//! wire quirks are out of scope for this core; this adapter exists only so
//! the Runner has a real, runnable reference implementation of the LLM
//! adapter contract.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use conductor_core::{ConductorError, ContentItem, Message, Role};
use conductor_runner::{LlmAdapter, LlmInput, LlmOutcome, LlmToolCall, Usage};

use crate::error::LlmError;

/// Generic HTTP chat-completion adapter. Compatible with any backend that
/// accepts `{model, messages, tools, max_tokens, temperature}` and replies
/// with `{choices: [{message: {content, tool_calls}, finish_reason}],
/// usage}` — the shape most self-hosted and gateway chat APIs converge on.
pub struct HttpChatAdapter {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl HttpChatAdapter {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            temperature: 0.2,
            max_tokens: 4096,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Translate the transcript into wire-format chat messages. A system
    /// prompt is injected as a `developer` role message ahead of the
    /// transcript, the role name several chat-completion APIs have adopted
    /// in place of `system` for instruction-following turns; tool_use/
    /// tool_result content items keep the adjacency the Runner already
    /// guarantees (assistant tool_use immediately followed by its
    /// tool_result), translated to `assistant.tool_calls` / `role: tool`
    /// pairs respectively.
    fn build_messages(system_prompt: &Option<String>, transcript: &[Message]) -> Vec<Value> {
        let mut out = Vec::new();
        if let Some(prompt) = system_prompt {
            out.push(json!({"role": "developer", "content": prompt}));
        }
        for message in transcript {
            match message.role {
                Role::User => {
                    let mut text_parts = Vec::new();
                    for item in &message.content {
                        match item {
                            ContentItem::Text { text } => text_parts.push(text.clone()),
                            ContentItem::ToolResult { tool_use_id, content } => {
                                out.push(json!({
                                    "role": "tool",
                                    "tool_call_id": tool_use_id,
                                    "content": content,
                                }));
                            }
                            ContentItem::ToolUse { .. } => {}
                        }
                    }
                    if !text_parts.is_empty() {
                        out.push(json!({"role": "user", "content": text_parts.join("\n")}));
                    }
                }
                Role::Assistant => {
                    let mut text_parts = Vec::new();
                    let mut tool_calls = Vec::new();
                    for item in &message.content {
                        match item {
                            ContentItem::Text { text } => text_parts.push(text.clone()),
                            ContentItem::ToolUse { id, name, input } => {
                                tool_calls.push(json!({
                                    "id": id,
                                    "name": name,
                                    "arguments": input,
                                }));
                            }
                            ContentItem::ToolResult { .. } => {}
                        }
                    }
                    let mut entry = json!({
                        "role": "assistant",
                        "content": text_parts.join("\n"),
                    });
                    if !tool_calls.is_empty() {
                        entry["tool_calls"] = Value::Array(tool_calls);
                    }
                    out.push(entry);
                }
            }
        }
        out
    }
}

#[async_trait]
impl LlmAdapter for HttpChatAdapter {
    async fn call(&self, input: LlmInput) -> Result<LlmOutcome, ConductorError> {
        let messages = Self::build_messages(&input.system_prompt, &input.messages);
        let tools: Vec<Value> = input
            .tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.agentic_name,
                    "description": t.description,
                    "parameters": t.input_schema,
                })
            })
            .collect();

        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
        });
        if !tools.is_empty() {
            body["tools"] = Value::Array(tools);
        }
        if let Some(schema) = &input.output_schema {
            body["response_format"] = json!({"type": "json_schema", "schema": schema});
        }

        let url = format!("{}/chat/completions", self.base_url);
        debug!(url = %url, model = %self.model, "dispatching chat completion request");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(LlmError::from)?;

        let status = response.status().as_u16();
        if status != 200 {
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, body: text }.into());
        }

        let parsed: Value = response.json().await.map_err(LlmError::from)?;
        let choice = parsed["choices"][0].clone();
        let finish_reason = choice["finish_reason"].as_str().unwrap_or_default().to_string();
        let message = &choice["message"];

        let raw_tool_calls = message["tool_calls"].as_array().cloned().unwrap_or_default();
        let usage = Usage {
            prompt_tokens: parsed["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
            completion_tokens: parsed["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
        };

        if !raw_tool_calls.is_empty() {
            let calls = raw_tool_calls
                .into_iter()
                .map(|call| LlmToolCall {
                    id: call["id"].as_str().unwrap_or_default().to_string(),
                    name: call["name"].as_str().unwrap_or_default().to_string(),
                    input: call["arguments"].clone(),
                })
                .collect();
            return Ok(LlmOutcome::ToolCalls { calls, usage });
        }

        let mut text = message["content"].as_str().unwrap_or_default().to_string();
        if finish_reason == "length" {
            text.push_str("\n[truncated: reached max_tokens]");
        }
        Ok(LlmOutcome::Response {
            value: Value::String(text),
            usage,
        })
    }

    fn provider_name(&self) -> &str {
        "http-generic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_core::{ContentItem, Message};

    #[test]
    fn build_messages_injects_developer_role_for_system_prompt() {
        let transcript = vec![Message::user(vec![ContentItem::text("hi")])];
        let messages = HttpChatAdapter::build_messages(&Some("be helpful".to_string()), &transcript);
        assert_eq!(messages[0]["role"], "developer");
        assert_eq!(messages[1]["role"], "user");
    }

    #[test]
    fn build_messages_translates_tool_use_and_result_adjacency() {
        let transcript = vec![
            Message::assistant(vec![ContentItem::tool_use("t1", "calc", json!({"x": 1}))]),
            Message::user(vec![ContentItem::tool_result("t1", "2")]),
        ];
        let messages = HttpChatAdapter::build_messages(&None, &transcript);
        assert_eq!(messages[0]["role"], "assistant");
        assert_eq!(messages[0]["tool_calls"][0]["id"], "t1");
        assert_eq!(messages[1]["role"], "tool");
        assert_eq!(messages[1]["tool_call_id"], "t1");
    }
}
