//! A toy in-process "service" standing in for a real calculator worker:
//! listens on the broker for tool requests and replies the way an external
//! process would, driving the Handler's resume path from outside.

use std::sync::Arc;

use anyhow::Result;
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use conductor_broker::{EventSubscriber, InMemoryBroker, InMemorySubscriber};
use conductor_core::Event;
use conductor_handler::ResumableHandler;

pub async fn run_calculator_service(
    broker: Arc<InMemoryBroker>,
    handler: Arc<ResumableHandler>,
    tool_address: &str,
    success_type: &str,
) -> Result<JoinHandle<()>> {
    let subscriber = InMemorySubscriber::new_for_address(broker, tool_address);
    subscriber.subscribe(tool_address).await?;

    let source = tool_address.to_string();
    let success_type = success_type.to_string();

    Ok(tokio::spawn(async move {
        loop {
            let request = match subscriber.recv().await {
                Ok(event) => event,
                Err(_) => break,
            };

            let expression = request
                .data
                .get("expression")
                .and_then(|v| v.as_str())
                .unwrap_or("0+0");
            let tool_use_id = request
                .data
                .get("toolUseId")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let result = evaluate(expression);
            info!(expression = %expression, result, "calculator service computed result");

            let reply = Event::new(
                source.clone(),
                success_type.clone(),
                request.subject.clone(),
                json!({"result": result, "toolUseId": tool_use_id}),
            );
            if let Err(err) = handler.handle(reply).await {
                warn!(error = %err, "calculator service's reply was not accepted");
            }
        }
    }))
}

/// Evaluates `a+b` or `a-b` for small integers. Good enough for a demo
/// binary; real expression parsing is out of scope here.
fn evaluate(expression: &str) -> i64 {
    let expression = expression.trim();
    if let Some((lhs, rhs)) = expression.split_once('+') {
        parse_int(lhs) + parse_int(rhs)
    } else if let Some((lhs, rhs)) = expression.split_once('-') {
        parse_int(lhs) - parse_int(rhs)
    } else {
        parse_int(expression)
    }
}

fn parse_int(s: &str) -> i64 {
    s.trim().parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluate_handles_addition_and_subtraction() {
        assert_eq!(evaluate("2+2"), 4);
        assert_eq!(evaluate("10 - 3"), 7);
        assert_eq!(evaluate("5"), 5);
    }
}
