//! The tool registry: the union of external and MCP tools built fresh for
//! one execution, each tagged with its agentic name, server kind, priority,
//! and approval requirement. Local to one Runner invocation so the
//! bidirectional name formatter never leaks across concurrent executions.

use std::collections::HashMap;

use conductor_core::{ConductorError, ToolDefinition, ToolNameFormatter, ToolServerKind};

use crate::tool_descriptor::{ExternalToolDescriptor, McpToolInfo};

#[derive(Debug, Default)]
pub struct ToolRegistry {
    formatter: ToolNameFormatter,
    by_agentic_name: HashMap<String, ToolDefinition>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry as the union of external and MCP tools. A name
    /// collision between two distinct raw names is a fatal configuration
    /// error.
    pub fn build(
        external: &[ExternalToolDescriptor],
        mcp_tools: &[McpToolInfo],
        mcp_restricted: &[String],
    ) -> Result<Self, ConductorError> {
        let mut registry = Self::new();
        for tool in external {
            registry.insert(
                &tool.raw_name,
                tool.description.clone(),
                tool.input_schema.clone(),
                ToolServerKind::External,
                tool.priority,
                tool.requires_approval,
            )?;
        }
        for tool in mcp_tools {
            let requires_approval = mcp_restricted.iter().any(|n| n == &tool.name);
            registry.insert(
                &tool.name,
                tool.description.clone(),
                tool.input_schema.clone(),
                ToolServerKind::Mcp,
                0,
                requires_approval,
            )?;
        }
        Ok(registry)
    }

    fn insert(
        &mut self,
        raw_name: &str,
        description: String,
        input_schema: serde_json::Value,
        server_kind: ToolServerKind,
        priority: i32,
        requires_approval: bool,
    ) -> Result<(), ConductorError> {
        let agentic_name = self.formatter.format(raw_name)?;
        self.by_agentic_name.insert(
            agentic_name.clone(),
            ToolDefinition {
                raw_name: raw_name.to_string(),
                agentic_name,
                description,
                input_schema,
                server_kind,
                priority,
                requires_approval,
            },
        );
        Ok(())
    }

    pub fn get(&self, agentic_name: &str) -> Option<&ToolDefinition> {
        self.by_agentic_name.get(agentic_name)
    }

    pub fn list(&self) -> impl Iterator<Item = &ToolDefinition> {
        self.by_agentic_name.values()
    }

    pub fn restricted(&self) -> Vec<&ToolDefinition> {
        self.by_agentic_name
            .values()
            .filter(|t| t.requires_approval)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.by_agentic_name.is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_agentic_name.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str) -> ExternalToolDescriptor {
        ExternalToolDescriptor::new(name, "a tool", serde_json::json!({}))
    }

    #[test]
    fn builds_union_of_external_and_mcp_tools() {
        let external = vec![descriptor("com.calculator.execute")];
        let mcp = vec![McpToolInfo {
            name: "search.web".to_string(),
            description: "search".to_string(),
            input_schema: serde_json::json!({}),
        }];
        let registry = ToolRegistry::build(&external, &mcp, &[]).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.get("com_calculator_execute").is_some());
        assert!(registry.get("search_web").is_some());
    }

    #[test]
    fn mcp_restricted_tools_are_tagged_requires_approval() {
        let mcp = vec![McpToolInfo {
            name: "payments.charge".to_string(),
            description: "charge".to_string(),
            input_schema: serde_json::json!({}),
        }];
        let registry =
            ToolRegistry::build(&[], &mcp, &["payments.charge".to_string()]).unwrap();
        let tool = registry.get("payments_charge").unwrap();
        assert!(tool.requires_approval);
    }

    #[test]
    fn colliding_names_are_a_configuration_error() {
        let external = vec![descriptor("com.calculator.execute"), descriptor("com_calculator.execute")];
        let err = ToolRegistry::build(&external, &[], &[]).unwrap_err();
        assert!(matches!(err, ConductorError::Config(_)));
    }
}
