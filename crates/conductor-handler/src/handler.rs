//! The Resumable Handler: turns the stateless Runner into a stateful,
//! event-driven agent by persisting the transcript between suspensions and
//! reassembling newly arrived tool-result events into a `resume` call.
//!
//! Built around the Runner's own init/resume split (`conductor_runner::Runner`),
//! adding instance locking, reply correlation, and the outbound emission
//! rules a standalone Runner invocation doesn't need.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc::Sender;

use conductor_core::{
    merge_tool_results, ConductorError, Event, Instance, Message, ToolRequest,
};
use conductor_runner::{
    ApprovalCache, DelegatorIdentity, ExternalToolDescriptor, InputValidator, McpConnection,
    OutputValidator, Runner, RunnerEvent, RunnerOutcome, RunnerParams, RunnerResult, SelfIdentity,
};
use conductor_store::StateStore;

use crate::config::HandlerConfig;
use crate::error::HandlerError;

/// One resumable agent handler: the Runner it drives, the store it persists
/// to, the broker it emits through, and the static wiring (contracts,
/// tools, validators) shared by every invocation.
pub struct ResumableHandler {
    store: Arc<StateStore>,
    runner: Arc<Runner>,
    publisher: Arc<dyn conductor_broker::EventPublisher>,
    config: HandlerConfig,
    self_identity: SelfIdentity,
    external_tools: Vec<ExternalToolDescriptor>,
    mcp_connection: Option<Arc<dyn McpConnection>>,
    approval_cache: Option<Arc<dyn ApprovalCache>>,
    approval_review_tools: Vec<ExternalToolDescriptor>,
    output_schema: Option<Value>,
    input_validator: Option<Arc<dyn InputValidator>>,
    output_validator: Option<Arc<dyn OutputValidator>>,
    event_sink: Option<Sender<RunnerEvent>>,
}

impl ResumableHandler {
    pub fn new(
        store: Arc<StateStore>,
        runner: Arc<Runner>,
        publisher: Arc<dyn conductor_broker::EventPublisher>,
        config: HandlerConfig,
        self_identity: SelfIdentity,
    ) -> Self {
        Self {
            store,
            runner,
            publisher,
            config,
            self_identity,
            external_tools: Vec::new(),
            mcp_connection: None,
            approval_cache: None,
            approval_review_tools: Vec::new(),
            output_schema: None,
            input_validator: None,
            output_validator: None,
            event_sink: None,
        }
    }

    pub fn with_external_tools(mut self, tools: Vec<ExternalToolDescriptor>) -> Self {
        self.external_tools = tools;
        self
    }

    pub fn with_mcp_connection(mut self, mcp: Arc<dyn McpConnection>) -> Self {
        self.mcp_connection = Some(mcp);
        self
    }

    pub fn with_approval_cache(mut self, cache: Arc<dyn ApprovalCache>) -> Self {
        self.approval_cache = Some(cache);
        self
    }

    pub fn with_approval_review_tools(mut self, tools: Vec<ExternalToolDescriptor>) -> Self {
        self.approval_review_tools = tools;
        self
    }

    pub fn with_output_schema(mut self, schema: Value) -> Self {
        self.output_schema = Some(schema);
        self
    }

    pub fn with_input_validator(mut self, validator: Arc<dyn InputValidator>) -> Self {
        self.input_validator = Some(validator);
        self
    }

    pub fn with_output_validator(mut self, validator: Arc<dyn OutputValidator>) -> Self {
        self.output_validator = Some(validator);
        self
    }

    pub fn with_event_sink(mut self, sink: Sender<RunnerEvent>) -> Self {
        self.event_sink = Some(sink);
        self
    }

    /// Handle one inbound event: acquire the instance lock, dispatch to
    /// init or resume, persist on success, emit outbound events, and
    /// release the lock unconditionally.
    pub async fn handle(&self, event: Event) -> Result<(), HandlerError> {
        let subject = event.subject.clone();
        self.store.lock_or_err(&subject).await?;
        let result = self.handle_locked(&event).await;
        self.store.unlock(&subject).await;
        result
    }

    async fn handle_locked(&self, event: &Event) -> Result<(), HandlerError> {
        let existing = self.store.read(&event.subject).await.map_err(HandlerError::from)?;

        match existing {
            None if event.event_type == self.config.self_contract.accepted_type => {
                self.handle_init(event).await
            }
            Some(mut instance) => self.handle_resume(event, &mut instance).await,
            None => Err(HandlerError::Core(ConductorError::Runtime(format!(
                "no instance for subject '{}' and event type '{}' is not the self-accept type",
                event.subject, event.event_type
            )))),
        }
    }

    async fn handle_init(&self, event: &Event) -> Result<(), HandlerError> {
        let user_message = event
            .data
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let delegated_by = event
            .data
            .get("delegatedBy")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());
        let delegator = delegated_by
            .as_ref()
            .map(|source| DelegatorIdentity { alias: source.clone(), source: source.clone() });

        tracing::info!(subject = %event.subject, "initializing new instance");
        let params = self.base_runner_params(Vec::new(), Some(user_message), Vec::new(), delegator, 0);
        let result = self.runner.init(params).await.map_err(HandlerError::from)?;

        let mut instance = Instance::new(event.subject.clone());
        instance.delegated_by = delegated_by;
        self.finish(event, &mut instance, result).await
    }

    async fn handle_resume(&self, event: &Event, instance: &mut Instance) -> Result<(), HandlerError> {
        // An approval response is also an ordinary tool reply: it both
        // carries a decision to cache and correlates to an outstanding
        // approval-tool `tool_use`, so it falls through to the same
        // collection bookkeeping below after this side effect.
        if Some(event.event_type.as_str()) == self.config.approval_response_type.as_deref() {
            self.apply_approval_response(event).await;
        }

        let Some(raw_tool_name) = self.config.raw_tool_for_reply_type(&event.event_type) else {
            return Err(HandlerError::Core(ConductorError::Runtime(format!(
                "unrecognized reply event type '{}'",
                event.event_type
            ))));
        };
        let expected_key = self.config.expected_reply_key(&raw_tool_name);

        let tool_use_id = event
            .data
            .get("toolUseId")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .unwrap_or_else(|| {
                tracing::warn!(
                    event_id = %event.id,
                    subject = %event.subject,
                    "reply event missing toolUseId; scope-matching by subject only"
                );
                String::new()
            });

        let content = if Some(event.event_type.as_str()) == self.config.approval_response_type.as_deref() {
            "Approval decision recorded.".to_string()
        } else if self.config.is_error_reply(&raw_tool_name, &event.event_type) {
            let message = event
                .data
                .get("errorMessage")
                .and_then(|v| v.as_str())
                .unwrap_or("tool execution failed");
            format!("Error (do not retry): {message}")
        } else {
            event
                .data
                .get("result")
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .unwrap_or_default()
        };

        merge_tool_results(&mut instance.messages, vec![(tool_use_id, content)]);
        if let Some(count) = instance.expected_tool_type_counts.get_mut(&expected_key) {
            if *count > 0 {
                *count -= 1;
            }
        }

        if !instance.all_replies_collected() {
            self.store
                .write(&event.subject, instance)
                .await
                .map_err(HandlerError::from)?;
            return Ok(());
        }

        let delegator = self.delegator_for(instance);
        let params = self.base_runner_params(
            instance.messages.clone(),
            None,
            Vec::new(),
            delegator,
            instance.tool_interaction_count,
        );
        let result = self.runner.resume(params).await.map_err(HandlerError::from)?;
        self.finish(event, instance, result).await
    }

    async fn apply_approval_response(&self, event: &Event) {
        let Some(cache) = &self.approval_cache else {
            return;
        };
        let Some(obj) = event.data.as_object() else {
            return;
        };
        let decisions: HashMap<String, bool> = obj
            .iter()
            .filter_map(|(name, value)| value.as_bool().map(|b| (name.clone(), b)))
            .collect();
        if decisions.is_empty() {
            return;
        }
        cache.set_batched(&self.self_identity.source, &decisions).await;
    }

    async fn finish(
        &self,
        event: &Event,
        instance: &mut Instance,
        result: RunnerResult,
    ) -> Result<(), HandlerError> {
        instance.messages = result.transcript;
        instance.tool_interaction_count = result.tool_interaction_count;
        instance.expected_tool_type_counts.clear();

        match result.outcome {
            RunnerOutcome::Response(response) => {
                self.store
                    .write(&event.subject, instance)
                    .await
                    .map_err(HandlerError::from)?;
                self.emit_completion(event, instance, response).await?;
                self.store.cleanup(&event.subject).await;
            }
            RunnerOutcome::ToolRequests(requests) => {
                for request in &requests {
                    instance.expect_reply(self.config.expected_reply_key(&request.request_type));
                }
                self.store
                    .write(&event.subject, instance)
                    .await
                    .map_err(HandlerError::from)?;
                self.emit_tool_requests(event, &requests).await?;
            }
        }
        Ok(())
    }

    async fn emit_completion(
        &self,
        event: &Event,
        instance: &Instance,
        response: Value,
    ) -> Result<(), HandlerError> {
        let completion_type = self
            .config
            .self_contract
            .completion_type
            .clone()
            .unwrap_or_else(|| format!("{}.success", self.config.self_contract.accepted_type));

        let mut data = serde_json::json!({ "output": { "response": response } });
        if self.config.include_message_history {
            data["messages"] = serde_json::to_value(&instance.messages)
                .unwrap_or(Value::Null);
        }

        let mut out = Event::new(
            self.self_identity.source.clone(),
            completion_type,
            event.subject.clone(),
            data,
        )
        .with_parent(event.id.clone());
        let to = instance.delegated_by.clone().unwrap_or_else(|| event.source.clone());
        out = out.with_to(to);

        tracing::info!(subject = %event.subject, "emitting completion event");
        self.publisher.publish(out).await?;
        Ok(())
    }

    async fn emit_tool_requests(
        &self,
        event: &Event,
        requests: &[ToolRequest],
    ) -> Result<(), HandlerError> {
        for request in requests {
            let mut data = request.data.clone();
            if let Value::Object(map) = &mut data {
                map.insert("parentSubject".to_string(), Value::String(event.subject.clone()));
                map.insert("toolUseId".to_string(), Value::String(request.id.clone()));
            }

            let mut out = Event::new(
                self.self_identity.source.clone(),
                request.request_type.clone(),
                event.subject.clone(),
                data,
            )
            .with_parent(event.id.clone())
            .with_to(request.request_type.clone());

            if let Some(domain) = self.config.domain_for(&request.request_type) {
                out = out.with_domain(domain.to_string());
            }

            tracing::info!(
                subject = %event.subject,
                tool = %request.request_type,
                "emitting tool request"
            );
            self.publisher.publish(out).await?;
        }
        Ok(())
    }

    fn delegator_for(&self, instance: &Instance) -> Option<DelegatorIdentity> {
        instance
            .delegated_by
            .as_ref()
            .map(|source| DelegatorIdentity { alias: source.clone(), source: source.clone() })
    }

    #[allow(clippy::too_many_arguments)]
    fn base_runner_params(
        &self,
        transcript: Vec<Message>,
        user_message: Option<String>,
        new_tool_results: Vec<(String, String)>,
        delegator: Option<DelegatorIdentity>,
        tool_interaction_count: u32,
    ) -> RunnerParams {
        RunnerParams {
            transcript,
            user_message,
            new_tool_results,
            external_tools: self.external_tools.clone(),
            mcp_connection: self.mcp_connection.clone(),
            approval_cache: self.approval_cache.clone(),
            self_identity: self.self_identity.clone(),
            delegator,
            output_schema: self.output_schema.clone(),
            approval_review_tools: self.approval_review_tools.clone(),
            input_validator: self.input_validator.clone(),
            output_validator: self.output_validator.clone(),
            event_sink: self.event_sink.clone(),
            tool_interaction_count,
        }
    }
}
