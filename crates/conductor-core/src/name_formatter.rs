//! Deterministic, reversible formatting of raw tool names into names an LLM
//! tool-calling API will accept.
//!
//! Built fresh per execution and owned by the registry it populates, never a
//! process-global, so two concurrent agents never pollute each other's
//! reverse map.

use std::collections::HashMap;

use crate::error::ConductorError;

/// Replaces disallowed characters (`.`) with `_` and keeps a reverse map so
/// a raw name can be recovered from its formatted form.
#[derive(Debug, Default)]
pub struct ToolNameFormatter {
    reverse: HashMap<String, String>,
}

impl ToolNameFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Format a raw tool name and register it. Returns a `Config` error if
    /// this formatted name has already been claimed by a different raw name
    /// (a formatting collision).
    pub fn format(&mut self, raw_name: &str) -> Result<String, ConductorError> {
        let formatted = raw_name.replace('.', "_");
        match self.reverse.get(&formatted) {
            Some(existing) if existing != raw_name => {
                return Err(ConductorError::Config(format!(
                    "tool name collision: '{raw_name}' and '{existing}' both format to '{formatted}'"
                )));
            }
            _ => {}
        }
        self.reverse.insert(formatted.clone(), raw_name.to_string());
        Ok(formatted)
    }

    /// Recover the raw name from a formatted (agentic) name, if known.
    pub fn reverse(&self, agentic_name: &str) -> Option<&str> {
        self.reverse.get(agentic_name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_for_every_raw_name() {
        let mut fmt = ToolNameFormatter::new();
        for raw in ["com.calculator.execute", "search.web", "no_dots"] {
            let formatted = fmt.format(raw).unwrap();
            assert_eq!(fmt.reverse(&formatted), Some(raw));
        }
    }

    #[test]
    fn distinct_raw_names_never_collide_silently() {
        let mut fmt = ToolNameFormatter::new();
        fmt.format("com.calculator.execute").unwrap();
        let err = fmt.format("com_calculator.execute").unwrap_err();
        assert!(matches!(err, ConductorError::Config(_)));
    }

    #[test]
    fn formatting_the_same_raw_name_twice_is_idempotent() {
        let mut fmt = ToolNameFormatter::new();
        let a = fmt.format("com.calculator.execute").unwrap();
        let b = fmt.format("com.calculator.execute").unwrap();
        assert_eq!(a, b);
    }
}
