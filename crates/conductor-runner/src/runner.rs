//! The Agent Execution Loop: bounded iterative dialogue with the LLM,
//! interleaving in-loop tool execution until a validated final response, an
//! external tool dispatch (suspend), or the hard iteration ceiling (fatal).
//!
//! A single `for iteration in 0..max_iterations` loop with budget tracking,
//! priority-based request selection, and in-loop MCP fan-out via
//! `futures::future::join_all`.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use serde_json::Value;
use tokio::sync::mpsc::Sender;
use tracing::{debug, info, warn};

use conductor_core::{
    merge_tool_results, ConductorError, ContentItem, Message, RunnerConfig, ToolRequest,
    ToolServerKind,
};

use crate::approval_cache::ApprovalCache;
use crate::context::{ContextBuilder, ContextInput, DefaultContextBuilder};
use crate::identity::{DelegatorIdentity, SelfIdentity};
use crate::llm_adapter::{LlmAdapter, LlmInput, LlmOutcome};
use crate::mcp_adapter::McpConnection;
use crate::registry::ToolRegistry;
use crate::stream::RunnerEvent;
use crate::tool_descriptor::ExternalToolDescriptor;
use crate::validator::{InputValidator, OutputValidator};

/// Input shared by `init` and `resume`. `init` ignores `transcript` and
/// `new_tool_results` and seeds the transcript from `user_message`;
/// `resume` ignores `user_message`.
pub struct RunnerParams {
    pub transcript: Vec<Message>,
    pub user_message: Option<String>,
    /// Tool results newly arrived for a resume call, keyed by the
    /// `tool_use_id` they correlate to. Merged into `transcript` before the
    /// loop continues.
    pub new_tool_results: Vec<(String, String)>,
    pub external_tools: Vec<ExternalToolDescriptor>,
    pub mcp_connection: Option<Arc<dyn McpConnection>>,
    pub approval_cache: Option<Arc<dyn ApprovalCache>>,
    pub self_identity: SelfIdentity,
    pub delegator: Option<DelegatorIdentity>,
    pub output_schema: Option<Value>,
    pub approval_review_tools: Vec<ExternalToolDescriptor>,
    pub input_validator: Option<Arc<dyn InputValidator>>,
    pub output_validator: Option<Arc<dyn OutputValidator>>,
    pub event_sink: Option<Sender<RunnerEvent>>,
    pub tool_interaction_count: u32,
}

impl RunnerParams {
    pub fn new(self_identity: SelfIdentity) -> Self {
        Self {
            transcript: Vec::new(),
            user_message: None,
            new_tool_results: Vec::new(),
            external_tools: Vec::new(),
            mcp_connection: None,
            approval_cache: None,
            self_identity,
            delegator: None,
            output_schema: None,
            approval_review_tools: Vec::new(),
            input_validator: None,
            output_validator: None,
            event_sink: None,
            tool_interaction_count: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub enum RunnerOutcome {
    Response(Value),
    ToolRequests(Vec<ToolRequest>),
}

pub struct RunnerResult {
    pub transcript: Vec<Message>,
    pub tool_interaction_count: u32,
    pub outcome: RunnerOutcome,
}

pub struct Runner {
    llm: Arc<dyn LlmAdapter>,
    context_builder: Arc<dyn ContextBuilder>,
    config: RunnerConfig,
}

impl Runner {
    pub fn new(llm: Arc<dyn LlmAdapter>, config: RunnerConfig) -> Self {
        Self {
            llm,
            context_builder: Arc::new(DefaultContextBuilder),
            config,
        }
    }

    pub fn with_context_builder(mut self, builder: Arc<dyn ContextBuilder>) -> Self {
        self.context_builder = builder;
        self
    }

    /// Start a fresh instance from a user message.
    pub async fn init(&self, mut params: RunnerParams) -> Result<RunnerResult, ConductorError> {
        let text = params.user_message.clone().unwrap_or_default();
        params.transcript = vec![Message::user(vec![ContentItem::text(text)])];
        params.tool_interaction_count = 0;
        self.run(params).await
    }

    /// Continue an existing transcript with newly arrived tool results.
    pub async fn resume(&self, params: RunnerParams) -> Result<RunnerResult, ConductorError> {
        self.run(params).await
    }

    async fn run(&self, mut params: RunnerParams) -> Result<RunnerResult, ConductorError> {
        merge_tool_results(&mut params.transcript, std::mem::take(&mut params.new_tool_results));

        // Initialization phase: clear registry each call, connect MCP, build the union.
        let (mcp_tools, mcp_restricted) = if let Some(mcp) = &params.mcp_connection {
            mcp.connect().await?;
            let tools = mcp.get_tools().await?;
            let restricted = mcp.restricted_tools();
            (tools, restricted)
        } else {
            (Vec::new(), Vec::new())
        };

        let mut all_external = params.external_tools.clone();
        all_external.extend(params.approval_review_tools.iter().cloned());
        let registry = ToolRegistry::build(&all_external, &mcp_tools, &mcp_restricted)?;
        let approval_review_names: std::collections::HashSet<&str> = params
            .approval_review_tools
            .iter()
            .map(|t| t.raw_name.as_str())
            .collect();

        let mut transcript = params.transcript;
        let mut tool_interaction_count = params.tool_interaction_count;

        for iteration in 0..self.config.max_iterations {
            if let Some(sink) = &params.event_sink {
                let _ = sink.send(RunnerEvent::IterationStart { iteration }).await;
            }
            debug!(iteration, tool_interaction_count, "runner iteration start");

            // Step 1: budget check.
            let budget_exhausted = tool_interaction_count >= self.config.max_tool_interactions;
            if budget_exhausted {
                if let Some(sink) = &params.event_sink {
                    let _ = sink
                        .send(RunnerEvent::ToolBudgetExhausted { tool_interaction_count })
                        .await;
                }
                info!(tool_interaction_count, "tool interaction budget exhausted");
            }

            // Approval resolution: re-queried at the start of every iteration.
            let restricted = registry.restricted();
            let mut effective_restricted = restricted;
            if let Some(cache) = &params.approval_cache {
                if !effective_restricted.is_empty() {
                    let names: Vec<String> = effective_restricted
                        .iter()
                        .map(|t| t.agentic_name.clone())
                        .collect();
                    let decisions = cache.get_batched(&params.self_identity.source, &names).await;
                    effective_restricted.retain(|t| {
                        !decisions.get(&t.agentic_name).map(|d| d.value).unwrap_or(false)
                    });
                }
            }
            for tool in &effective_restricted {
                if let Some(sink) = &params.event_sink {
                    let _ = sink
                        .send(RunnerEvent::ApprovalRequired {
                            agentic_name: tool.agentic_name.clone(),
                        })
                        .await;
                }
            }

            let approval_review_defs: Vec<_> = registry
                .list()
                .filter(|t| approval_review_names.contains(t.raw_name.as_str()))
                .collect();

            // Step 2: pure context build.
            let context = self.context_builder.build(ContextInput {
                transcript: &transcript,
                self_identity: &params.self_identity,
                delegator: params.delegator.as_ref(),
                registry_tools: registry.list().collect(),
                restricted_tools: effective_restricted,
                output_schema_present: params.output_schema.is_some(),
                tool_interaction_count,
                max_tool_interactions: self.config.max_tool_interactions,
                budget_exhausted,
                approval_review_tools: approval_review_defs,
            });

            // Step 3: LLM call.
            let llm_input = LlmInput {
                system_prompt: context.system_prompt,
                messages: context.messages,
                tools: registry.list().cloned().collect(),
                output_schema: params.output_schema.clone(),
            };
            let outcome = self.llm.call(llm_input).await?;

            match outcome {
                LlmOutcome::Response { value, .. } => {
                    let text = match &value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    transcript.push(Message::assistant(vec![ContentItem::text(text)]));

                    if let Some(validator) = &params.output_validator {
                        if !budget_exhausted {
                            match validator.validate(&value, budget_exhausted).await {
                                Ok(()) => {
                                    if let Some(sink) = &params.event_sink {
                                        let _ = sink.send(RunnerEvent::Completed).await;
                                    }
                                    return Ok(RunnerResult {
                                        transcript,
                                        tool_interaction_count,
                                        outcome: RunnerOutcome::Response(value),
                                    });
                                }
                                Err(failure) => {
                                    if let Some(sink) = &params.event_sink {
                                        let _ = sink
                                            .send(RunnerEvent::ValidationFailed {
                                                message: failure.message.clone(),
                                            })
                                            .await;
                                    }
                                    warn!(error = %failure.message, "output validation failed");
                                    transcript.push(Message::user(vec![ContentItem::text(
                                        failure.to_user_text(),
                                    )]));
                                    tool_interaction_count += 1;
                                    continue;
                                }
                            }
                        }
                    }

                    if let Some(sink) = &params.event_sink {
                        let _ = sink.send(RunnerEvent::Completed).await;
                    }
                    return Ok(RunnerResult {
                        transcript,
                        tool_interaction_count,
                        outcome: RunnerOutcome::Response(value),
                    });
                }

                LlmOutcome::ToolCalls { calls, .. } => {
                    tool_interaction_count += 1;

                    // Prioritize: keep only the highest-priority group.
                    let priority_of = |name: &str| {
                        registry.get(name).map(|t| t.priority).unwrap_or(0)
                    };
                    let max_priority = calls.iter().map(|c| priority_of(&c.name)).max().unwrap_or(0);
                    let (selected, dropped): (Vec<_>, Vec<_>) =
                        calls.into_iter().partition(|c| priority_of(&c.name) == max_priority);
                    if !dropped.is_empty() {
                        debug!(count = dropped.len(), "dropped lower-priority tool requests");
                    }

                    for call in &selected {
                        transcript.push(Message::assistant(vec![ContentItem::tool_use(
                            call.id.clone(),
                            call.name.clone(),
                            call.input.clone(),
                        )]));
                    }

                    let mut immediate_results: Vec<(String, String)> = Vec::new();
                    let mut queued_requests: Vec<ToolRequest> = Vec::new();
                    let mut mcp_futures = Vec::new();

                    for call in &selected {
                        match registry.get(&call.name) {
                            None => {
                                immediate_results.push((
                                    call.id.clone(),
                                    format!("Tool does not exist: {}", call.name),
                                ));
                            }
                            Some(tool) => match tool.server_kind {
                                ToolServerKind::External => {
                                    let mut validation_error = None;
                                    if let Some(validator) = &params.input_validator {
                                        if !budget_exhausted {
                                            if let Err(failure) =
                                                validator.validate(&tool.raw_name, &call.input).await
                                            {
                                                validation_error = Some(failure);
                                            }
                                        }
                                    }
                                    match validation_error {
                                        Some(failure) => {
                                            if let Some(sink) = &params.event_sink {
                                                let _ = sink
                                                    .send(RunnerEvent::ValidationFailed {
                                                        message: failure.message.clone(),
                                                    })
                                                    .await;
                                            }
                                            immediate_results
                                                .push((call.id.clone(), failure.to_user_text()));
                                        }
                                        None => {
                                            queued_requests.push(ToolRequest {
                                                id: call.id.clone(),
                                                request_type: tool.raw_name.clone(),
                                                data: call.input.clone(),
                                            });
                                        }
                                    }
                                }
                                ToolServerKind::Mcp => {
                                    let mcp = params
                                        .mcp_connection
                                        .clone()
                                        .expect("mcp tool resolved without an mcp connection");
                                    let raw_name = tool.raw_name.clone();
                                    let id = call.id.clone();
                                    let input = call.input.clone();
                                    mcp_futures.push(async move {
                                        let result = mcp.invoke_tool(&raw_name, Some(input)).await;
                                        match result {
                                            Ok(text) => (id, text, false),
                                            Err(err) => (id, err.to_string(), true),
                                        }
                                    });
                                }
                            },
                        }
                    }

                    if !mcp_futures.is_empty() {
                        let mcp_results = join_all(mcp_futures).await;
                        for (id, content, is_error) in mcp_results {
                            if let Some(sink) = &params.event_sink {
                                let _ = sink
                                    .send(RunnerEvent::ToolDispatchResult { id: id.clone(), is_error })
                                    .await;
                            }
                            immediate_results.push((id, content));
                        }
                    }

                    // Re-order immediate_results into request-listing order.
                    let order: HashMap<&str, usize> = selected
                        .iter()
                        .enumerate()
                        .map(|(i, c)| (c.id.as_str(), i))
                        .collect();
                    immediate_results.sort_by_key(|(id, _)| order.get(id.as_str()).copied().unwrap_or(usize::MAX));

                    if !immediate_results.is_empty() {
                        merge_tool_results(&mut transcript, immediate_results);
                    }

                    if !queued_requests.is_empty() {
                        return Ok(RunnerResult {
                            transcript,
                            tool_interaction_count,
                            outcome: RunnerOutcome::ToolRequests(queued_requests),
                        });
                    }
                    continue;
                }
            }
        }

        Err(ConductorError::Runtime(format!(
            "exceeded iteration ceiling of {}",
            self.config.max_iterations
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::tool_descriptor::McpToolInfo;
    use crate::validator::ValidationFailure;

    /// A queue-driven mock LLM: callers push the outcomes to return, popped
    /// one per call in FIFO order.
    struct MockLlm {
        queue: std::sync::Mutex<VecDeque<LlmOutcome>>,
    }

    impl MockLlm {
        fn new(outcomes: Vec<LlmOutcome>) -> Self {
            Self {
                queue: std::sync::Mutex::new(outcomes.into_iter().collect()),
            }
        }
    }

    #[async_trait]
    impl LlmAdapter for MockLlm {
        async fn call(&self, _input: LlmInput) -> Result<LlmOutcome, ConductorError> {
            self.queue
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| ConductorError::Runtime("mock LLM queue exhausted".to_string()))
        }
    }

    fn identity() -> SelfIdentity {
        SelfIdentity {
            alias: "calculator".to_string(),
            source: "agent.calculator".to_string(),
            description: "adds numbers".to_string(),
        }
    }

    fn runner(llm: MockLlm, config: RunnerConfig) -> Runner {
        Runner::new(Arc::new(llm), config)
    }

    fn call(id: &str, name: &str) -> LlmToolCall {
        LlmToolCall {
            id: id.to_string(),
            name: name.to_string(),
            input: Value::Null,
        }
    }

    #[tokio::test]
    async fn only_the_highest_priority_tool_requests_are_emitted() {
        // Priorities {0,0,1,2,2}: only the two priority-2 requests should be
        // queued for this iteration; the rest are dropped, not retained.
        let tools = vec![
            ExternalToolDescriptor::new("tool.p0a", "p0a", Value::Null).with_priority(0),
            ExternalToolDescriptor::new("tool.p0b", "p0b", Value::Null).with_priority(0),
            ExternalToolDescriptor::new("tool.p1", "p1", Value::Null).with_priority(1),
            ExternalToolDescriptor::new("tool.p2a", "p2a", Value::Null).with_priority(2),
            ExternalToolDescriptor::new("tool.p2b", "p2b", Value::Null).with_priority(2),
        ];

        let llm = MockLlm::new(vec![LlmOutcome::ToolCalls {
            calls: vec![
                call("c1", "tool_p0a"),
                call("c2", "tool_p0b"),
                call("c3", "tool_p1"),
                call("c4", "tool_p2a"),
                call("c5", "tool_p2b"),
            ],
            usage: Usage::default(),
        }]);

        let runner = runner(llm, RunnerConfig { max_tool_interactions: 5, max_iterations: 10 });
        let mut params = RunnerParams::new(identity());
        params.user_message = Some("do the priority-2 things".to_string());
        params.external_tools = tools;

        let result = runner.init(params).await.unwrap();
        match result.outcome {
            RunnerOutcome::ToolRequests(requests) => {
                let ids: Vec<&str> = requests.iter().map(|r| r.id.as_str()).collect();
                assert_eq!(ids, vec!["c4", "c5"]);
            }
            RunnerOutcome::Response(_) => panic!("expected suspended tool requests"),
        }
        assert_eq!(result.tool_interaction_count, 1);
    }

    struct CountingOutputValidator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl OutputValidator for CountingOutputValidator {
        async fn validate(&self, _output: &Value, _exhausted: bool) -> Result<(), ValidationFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ValidationFailure::new("always rejects"))
        }
    }

    #[tokio::test]
    async fn exhausted_budget_skips_output_validation_and_returns_verbatim() {
        let llm = MockLlm::new(vec![LlmOutcome::Response {
            value: Value::String("Partial: result so far is 7".to_string()),
            usage: Usage::default(),
        }]);
        // max_tool_interactions = 0 means the budget is already exhausted
        // before the first LLM call.
        let runner = runner(llm, RunnerConfig { max_tool_interactions: 0, max_iterations: 10 });

        let validator = Arc::new(CountingOutputValidator { calls: AtomicUsize::new(0) });
        let mut params = RunnerParams::new(identity());
        params.user_message = Some("keep going".to_string());
        params.output_validator = Some(validator.clone());

        let result = runner.init(params).await.unwrap();
        match result.outcome {
            RunnerOutcome::Response(value) => {
                assert_eq!(value, Value::String("Partial: result so far is 7".to_string()));
            }
            RunnerOutcome::ToolRequests(_) => panic!("expected a final response"),
        }
        assert_eq!(
            validator.calls.load(Ordering::SeqCst),
            0,
            "output validator must not run once the budget is exhausted"
        );
    }

    /// An MCP connection with one tool that sleeps before replying, used to
    /// prove tool_results land in request-listing order rather than
    /// completion order.
    struct SlowMcp;

    #[async_trait]
    impl McpConnection for SlowMcp {
        async fn connect(&self) -> Result<(), ConductorError> {
            Ok(())
        }

        async fn disconnect(&self) -> Result<(), ConductorError> {
            Ok(())
        }

        async fn get_tools(&self) -> Result<Vec<McpToolInfo>, ConductorError> {
            Ok(vec![McpToolInfo {
                name: "mcp.lookup".to_string(),
                description: "looks things up".to_string(),
                input_schema: Value::Null,
            }])
        }

        async fn invoke_tool(&self, name: &str, _arguments: Option<Value>) -> Result<String, ConductorError> {
            tokio::time::sleep(Duration::from_millis(30)).await;
            Ok(format!("{name}-done"))
        }
    }

    #[tokio::test]
    async fn tool_results_are_ordered_by_request_listing_not_completion() {
        // Listing order is [mcp call, unknown-tool call]. The unknown tool
        // resolves synchronously (added to immediate_results first); the MCP
        // call only resolves after its future is awaited later. Without the
        // final reorder-by-listing-order step this would come back reversed.
        let llm = MockLlm::new(vec![
            LlmOutcome::ToolCalls {
                calls: vec![call("m1", "mcp_lookup"), call("u1", "ghost_tool")],
                usage: Usage::default(),
            },
            LlmOutcome::Response {
                value: Value::String("done".to_string()),
                usage: Usage::default(),
            },
        ]);

        let runner = runner(llm, RunnerConfig { max_tool_interactions: 5, max_iterations: 10 });
        let mut params = RunnerParams::new(identity());
        params.user_message = Some("look something up".to_string());
        params.mcp_connection = Some(Arc::new(SlowMcp));

        let result = runner.init(params).await.unwrap();
        let results: Vec<(&str, &str)> = result
            .transcript
            .iter()
            .flat_map(|m| m.content.iter())
            .filter_map(|item| match item {
                ContentItem::ToolResult { tool_use_id, content } => {
                    Some((tool_use_id.as_str(), content.as_str()))
                }
                _ => None,
            })
            .collect();
        assert_eq!(results[0].0, "m1");
        assert!(results[0].1.contains("mcp.lookup-done"));
        assert_eq!(results[1].0, "u1");
        assert!(results[1].1.contains("Tool does not exist"));
    }
}
