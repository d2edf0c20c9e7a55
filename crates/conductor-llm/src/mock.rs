//! A queue-driven mock adapter for exercising the Runner without a real
//! LLM backend: callers queue the outcomes to return, one per call, popped
//! in order.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use conductor_core::ConductorError;
use conductor_runner::{LlmAdapter, LlmInput, LlmOutcome, LlmToolCall, Usage};

/// A mock provider that returns pre-queued outcomes in FIFO order. Useful
/// for deterministic Runner and Handler integration tests.
pub struct MockLlmAdapter {
    queue: Mutex<Vec<LlmOutcome>>,
}

impl Default for MockLlmAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLlmAdapter {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(Vec::new()),
        }
    }

    /// Queue a final-response outcome.
    pub fn queue_response(&self, value: Value) {
        self.queue.lock().unwrap().push(LlmOutcome::Response {
            value,
            usage: Usage::default(),
        });
    }

    /// Queue a final text-response outcome.
    pub fn queue_text(&self, text: impl Into<String>) {
        self.queue_response(Value::String(text.into()));
    }

    /// Queue a tool-call outcome.
    pub fn queue_tool_calls(&self, calls: Vec<LlmToolCall>) {
        self.queue.lock().unwrap().push(LlmOutcome::ToolCalls {
            calls,
            usage: Usage::default(),
        });
    }

    pub fn remaining(&self) -> usize {
        self.queue.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmAdapter for MockLlmAdapter {
    async fn call(&self, _input: LlmInput) -> Result<LlmOutcome, ConductorError> {
        let mut queue = self.queue.lock().unwrap();
        if queue.is_empty() {
            return Ok(LlmOutcome::Response {
                value: Value::String(String::new()),
                usage: Usage::default(),
            });
        }
        Ok(queue.remove(0))
    }

    fn provider_name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn queued_outcomes_are_returned_in_fifo_order() {
        let adapter = MockLlmAdapter::new();
        adapter.queue_text("first");
        adapter.queue_text("second");

        let input = LlmInput {
            system_prompt: None,
            messages: vec![],
            tools: vec![],
            output_schema: None,
        };
        let first = adapter.call(
            LlmInput { ..clone_input(&input) },
        ).await.unwrap();
        match first {
            LlmOutcome::Response { value, .. } => assert_eq!(value, Value::String("first".into())),
            _ => panic!("expected response"),
        }
        let second = adapter.call(input).await.unwrap();
        match second {
            LlmOutcome::Response { value, .. } => assert_eq!(value, Value::String("second".into())),
            _ => panic!("expected response"),
        }
    }

    #[tokio::test]
    async fn empty_queue_returns_empty_text_response() {
        let adapter = MockLlmAdapter::new();
        let outcome = adapter
            .call(LlmInput {
                system_prompt: None,
                messages: vec![],
                tools: vec![],
                output_schema: None,
            })
            .await
            .unwrap();
        assert!(matches!(outcome, LlmOutcome::Response { .. }));
    }

    fn clone_input(input: &LlmInput) -> LlmInput {
        LlmInput {
            system_prompt: input.system_prompt.clone(),
            messages: input.messages.clone(),
            tools: input.tools.clone(),
            output_schema: input.output_schema.clone(),
        }
    }
}
