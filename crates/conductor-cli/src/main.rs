//! `conductor-cli` — a run-once example driver: wires a Runner, a
//! ResumableHandler, an in-memory Store and Broker, and either the HTTP
//! adapter or the scripted mock adapter together, then pushes one `init`
//! event through the Handler and prints every event that comes back out.
//!
//! Exists for manual smoke-testing and as a worked example of how the
//! pieces in this workspace compose.

mod cli;
mod demo_tool;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use tracing::info;

use conductor_broker::{EventPublisher, EventSubscriber, InMemoryBroker, InMemorySubscriber};
use conductor_core::{Contract, Event, LockConfig, RunnerConfig};
use conductor_handler::{HandlerConfig, ResumableHandler, ServiceRoute};
use conductor_llm::{HttpChatAdapter, MockLlmAdapter};
use conductor_runner::{ExternalToolDescriptor, LlmAdapter, LlmToolCall, Runner, SelfIdentity};
use conductor_store::{StateStore, StoreConfig};

use crate::cli::CliArgs;
use crate::demo_tool::run_calculator_service;

const CALCULATOR_TOOL: &str = "com.calculator.execute";
const CALCULATOR_SUCCESS: &str = "evt.calculator.execute.success";
const CALCULATOR_ERROR: &str = "evt.calculator.execute.error";
const SELF_SOURCE: &str = "agent.calculator";
const SELF_ACCEPT_TYPE: &str = "agent.calculator.start";
const SELF_COMPLETION_TYPE: &str = "evt.agent.calculator.success";
const CALLER_ADDRESS: &str = "caller";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();
    let subject = args
        .subject
        .clone()
        .unwrap_or_else(|| format!("demo-{}", uuid::Uuid::new_v4()));

    let llm: Arc<dyn LlmAdapter> = match &args.llm_url {
        Some(url) => {
            info!(url = %url, model = %args.model, "using HTTP chat adapter");
            Arc::new(HttpChatAdapter::new(url.clone(), args.model.clone()))
        }
        None => {
            info!("no --llm-url given; using the scripted mock adapter");
            let mock = Arc::new(MockLlmAdapter::new());
            mock.queue_tool_calls(vec![LlmToolCall {
                id: "demo-1".to_string(),
                name: "com_calculator_execute".to_string(),
                input: json!({"expression": "2+2"}),
            }]);
            mock.queue_text("The answer is 4.");
            mock
        }
    };

    let runner = Arc::new(Runner::new(llm, RunnerConfig::from_env()));
    let store = Arc::new(StateStore::new(StoreConfig {
        lock: LockConfig::from_env(),
        cleanup_enabled: true,
    }));
    let broker = Arc::new(InMemoryBroker::new());

    let contract = Contract::new("urn:agent:calculator", "1.0.0", SELF_ACCEPT_TYPE)
        .with_emitted_type(CALCULATOR_TOOL)
        .with_completion_type(SELF_COMPLETION_TYPE);

    let handler_config = HandlerConfig::new(contract).with_route(
        CALCULATOR_TOOL,
        ServiceRoute::new(CALCULATOR_SUCCESS, CALCULATOR_ERROR),
    );

    let self_identity = SelfIdentity {
        alias: "calculator".to_string(),
        source: SELF_SOURCE.to_string(),
        description: "adds and subtracts small integers".to_string(),
    };

    let handler = Arc::new(
        ResumableHandler::new(
            store,
            runner,
            broker.clone() as Arc<dyn EventPublisher>,
            handler_config,
            self_identity,
        )
        .with_external_tools(vec![ExternalToolDescriptor::new(
            CALCULATOR_TOOL,
            "evaluates a simple arithmetic expression",
            json!({"type": "object", "properties": {"expression": {"type": "string"}}}),
        )]),
    );

    let completion_sub = InMemorySubscriber::new_for_address(broker.clone(), CALLER_ADDRESS);
    completion_sub
        .subscribe(CALLER_ADDRESS)
        .await
        .context("subscribing to the completion address")?;

    // The in-process calculator service: listens for tool requests and
    // replies on the broker exactly like a real service would.
    let service_handle = run_calculator_service(
        broker.clone(),
        handler.clone(),
        CALCULATOR_TOOL,
        CALCULATOR_SUCCESS,
    )
    .await?;

    let init_event = Event::new(
        CALLER_ADDRESS,
        SELF_ACCEPT_TYPE,
        subject.clone(),
        json!({"message": args.message}),
    );
    info!(subject = %subject, "dispatching init event");
    handler.handle(init_event).await?;

    let completion = completion_sub.recv().await?;
    println!("{}", serde_json::to_string_pretty(&completion)?);

    service_handle.abort();
    Ok(())
}
