//! Static wiring for one resumable handler: its self-contract, the service
//! contracts it depends on for correlation and routing, and the approval
//! response type it recognizes.

use std::collections::HashMap;

use conductor_core::Contract;

/// Where a tool request is routed and which event types constitute its
/// reply, derived from the service's own contract.
#[derive(Debug, Clone)]
pub struct ServiceRoute {
    /// Event type emitted when the remote tool succeeds.
    pub success_type: String,
    /// Event type emitted when the remote tool fails.
    pub error_type: String,
    /// Routing tag steering the outbound request to a consumer pool (human
    /// interaction, a particular worker class, ...). `None` uses default
    /// routing.
    pub domain: Option<String>,
}

impl ServiceRoute {
    pub fn new(success_type: impl Into<String>, error_type: impl Into<String>) -> Self {
        Self {
            success_type: success_type.into(),
            error_type: error_type.into(),
            domain: None,
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }
}

/// The per-handler configuration a `ResumableHandler` is built from.
#[derive(Debug, Clone)]
pub struct HandlerConfig {
    pub self_contract: Contract,
    /// Raw tool name → the service route describing its reply types and
    /// domain. Looked up by the tool request's `type` field.
    pub service_routes: HashMap<String, ServiceRoute>,
    /// The event type that carries an approval/review decision back to
    /// this handler, if any approval-review tools are configured.
    pub approval_response_type: Option<String>,
    /// Whether the completion event's `data` includes the full message
    /// history alongside the response.
    pub include_message_history: bool,
}

impl HandlerConfig {
    pub fn new(self_contract: Contract) -> Self {
        Self {
            self_contract,
            service_routes: HashMap::new(),
            approval_response_type: None,
            include_message_history: false,
        }
    }

    pub fn with_route(mut self, raw_tool_name: impl Into<String>, route: ServiceRoute) -> Self {
        self.service_routes.insert(raw_tool_name.into(), route);
        self
    }

    pub fn with_approval_response_type(mut self, event_type: impl Into<String>) -> Self {
        self.approval_response_type = Some(event_type.into());
        self
    }

    pub fn with_message_history(mut self, include: bool) -> Self {
        self.include_message_history = include;
        self
    }

    /// The canonical key tracked in `Instance::expected_tool_type_counts`
    /// for one outstanding request to `raw_tool_name`: the configured
    /// success type, or a conventional fallback when no route is declared.
    pub fn expected_reply_key(&self, raw_tool_name: &str) -> String {
        self.service_routes
            .get(raw_tool_name)
            .map(|route| route.success_type.clone())
            .unwrap_or_else(|| format!("{raw_tool_name}.success"))
    }

    /// Whether `event_type` is the success or error reply for
    /// `raw_tool_name`, given its configured (or fallback) route.
    pub fn matches_reply(&self, raw_tool_name: &str, event_type: &str) -> bool {
        match self.service_routes.get(raw_tool_name) {
            Some(route) => event_type == route.success_type || event_type == route.error_type,
            None => {
                event_type == format!("{raw_tool_name}.success")
                    || event_type == format!("{raw_tool_name}.error")
            }
        }
    }

    /// Whether `event_type` denotes a failure reply for `raw_tool_name`.
    pub fn is_error_reply(&self, raw_tool_name: &str, event_type: &str) -> bool {
        match self.service_routes.get(raw_tool_name) {
            Some(route) => event_type == route.error_type,
            None => event_type == format!("{raw_tool_name}.error"),
        }
    }

    /// Reverse lookup: given an arrived reply event's type, find the raw
    /// tool name it answers. Checked against configured routes first, then
    /// the `.success`/`.error` suffix convention.
    pub fn raw_tool_for_reply_type(&self, event_type: &str) -> Option<String> {
        for (raw_name, route) in &self.service_routes {
            if route.success_type == event_type || route.error_type == event_type {
                return Some(raw_name.clone());
            }
        }
        event_type
            .strip_suffix(".success")
            .or_else(|| event_type.strip_suffix(".error"))
            .map(|s| s.to_string())
    }

    pub fn domain_for(&self, raw_tool_name: &str) -> Option<&str> {
        self.service_routes
            .get(raw_tool_name)
            .and_then(|route| route.domain.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract() -> Contract {
        Contract::new("urn:agent:calculator", "1.0.0", "com.calculator.do")
            .with_completion_type("evt.calculator.do.success")
    }

    #[test]
    fn expected_reply_key_uses_configured_success_type() {
        let config = HandlerConfig::new(contract()).with_route(
            "com.calculator.execute",
            ServiceRoute::new(
                "evt.calculator.execute.success",
                "evt.calculator.execute.error",
            ),
        );
        assert_eq!(
            config.expected_reply_key("com.calculator.execute"),
            "evt.calculator.execute.success"
        );
    }

    #[test]
    fn matches_reply_accepts_both_success_and_error_types() {
        let config = HandlerConfig::new(contract()).with_route(
            "com.calculator.execute",
            ServiceRoute::new(
                "evt.calculator.execute.success",
                "evt.calculator.execute.error",
            ),
        );
        assert!(config.matches_reply("com.calculator.execute", "evt.calculator.execute.success"));
        assert!(config.matches_reply("com.calculator.execute", "evt.calculator.execute.error"));
        assert!(!config.matches_reply("com.calculator.execute", "evt.other.success"));
    }

    #[test]
    fn unconfigured_route_falls_back_to_suffix_convention() {
        let config = HandlerConfig::new(contract());
        assert_eq!(
            config.expected_reply_key("search.web"),
            "search.web.success"
        );
        assert!(config.matches_reply("search.web", "search.web.error"));
        assert!(config.is_error_reply("search.web", "search.web.error"));
    }
}
