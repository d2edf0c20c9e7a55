//! Pure context builder: assembles `{systemPrompt?, messages}` from the
//! transcript and surrounding identity/registry/budget state by joining
//! named sections. Required to be a pure function — it MUST NOT mutate its
//! inputs.

use conductor_core::{Message, ToolDefinition};

use crate::identity::{DelegatorIdentity, SelfIdentity};

pub struct ContextInput<'a> {
    pub transcript: &'a [Message],
    pub self_identity: &'a SelfIdentity,
    pub delegator: Option<&'a DelegatorIdentity>,
    pub registry_tools: Vec<&'a ToolDefinition>,
    pub restricted_tools: Vec<&'a ToolDefinition>,
    pub output_schema_present: bool,
    pub tool_interaction_count: u32,
    pub max_tool_interactions: u32,
    pub budget_exhausted: bool,
    pub approval_review_tools: Vec<&'a ToolDefinition>,
}

pub struct ContextOutput {
    pub system_prompt: Option<String>,
    pub messages: Vec<Message>,
}

pub trait ContextBuilder: Send + Sync {
    fn build(&self, input: ContextInput<'_>) -> ContextOutput;
}

/// The reference context builder: assembles a system prompt from named
/// sections (identity, delegation, tool listing, restricted-tool notice,
/// budget notice, output-format notice) joined the way
/// `load_project_context` joins discovered doc sections.
#[derive(Debug, Default)]
pub struct DefaultContextBuilder;

impl ContextBuilder for DefaultContextBuilder {
    fn build(&self, input: ContextInput<'_>) -> ContextOutput {
        let mut sections = Vec::new();

        sections.push(format!(
            "You are {} ({}). {}",
            input.self_identity.alias, input.self_identity.source, input.self_identity.description
        ));

        if let Some(delegator) = input.delegator {
            sections.push(format!(
                "You were delegated this task by {} ({}).",
                delegator.alias, delegator.source
            ));
        }

        if !input.registry_tools.is_empty() {
            let listing = input
                .registry_tools
                .iter()
                .map(|t| format!("- {} ({})", t.agentic_name, t.description))
                .collect::<Vec<_>>()
                .join("\n");
            sections.push(format!("Available tools:\n{listing}"));
        }

        if !input.restricted_tools.is_empty() {
            let listing = input
                .restricted_tools
                .iter()
                .map(|t| t.agentic_name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            sections.push(format!(
                "These tools require approval before use: {listing}. Use the approval-review tools if listed below to request it."
            ));
        }

        if !input.approval_review_tools.is_empty() {
            let listing = input
                .approval_review_tools
                .iter()
                .map(|t| t.agentic_name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            sections.push(format!("Approval/human-review tools available: {listing}."));
        }

        if input.output_schema_present {
            sections.push(
                "Your final response must conform to the provided output schema.".to_string(),
            );
        }

        sections.push(format!(
            "Tool interactions used: {}/{}.",
            input.tool_interaction_count, input.max_tool_interactions
        ));

        if input.budget_exhausted {
            sections.push(
                "Your tool-call budget is exhausted. You MUST finalize a response now without requesting further tools.".to_string(),
            );
        }

        ContextOutput {
            system_prompt: Some(sections.join("\n\n---\n\n")),
            messages: input.transcript.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_core::ContentItem;

    #[test]
    fn build_does_not_mutate_inputs() {
        let transcript = vec![Message::user(vec![ContentItem::text("hello")])];
        let identity = SelfIdentity {
            alias: "calculator".into(),
            source: "agent.calculator".into(),
            description: "does math".into(),
        };
        let builder = DefaultContextBuilder;
        let input = ContextInput {
            transcript: &transcript,
            self_identity: &identity,
            delegator: None,
            registry_tools: vec![],
            restricted_tools: vec![],
            output_schema_present: false,
            tool_interaction_count: 0,
            max_tool_interactions: 5,
            budget_exhausted: false,
            approval_review_tools: vec![],
        };
        let before_len = transcript.len();
        let output = builder.build(input);
        assert_eq!(transcript.len(), before_len);
        assert_eq!(output.messages.len(), 1);
        assert!(output.system_prompt.unwrap().contains("calculator"));
    }

    #[test]
    fn budget_exhausted_notice_appears_in_prompt() {
        let transcript = vec![];
        let identity = SelfIdentity {
            alias: "a".into(),
            source: "s".into(),
            description: "d".into(),
        };
        let input = ContextInput {
            transcript: &transcript,
            self_identity: &identity,
            delegator: None,
            registry_tools: vec![],
            restricted_tools: vec![],
            output_schema_present: false,
            tool_interaction_count: 5,
            max_tool_interactions: 5,
            budget_exhausted: true,
            approval_review_tools: vec![],
        };
        let output = DefaultContextBuilder.build(input);
        assert!(output.system_prompt.unwrap().contains("budget is exhausted"));
    }
}
