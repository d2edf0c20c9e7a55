//! Deep-clone helper for the State Store boundary.
//!
//! Every persisted record already derives `Serialize`/`Deserialize`, so a
//! serialize-then-deserialize round trip through `serde_json::Value` gives
//! the structural deep copy the Store must return on every `read` without a
//! hand-rolled recursive cloner, and guarantees no shared mutable state
//! crosses the boundary even if a caller mutates the clone afterward.

use serde::{de::DeserializeOwned, Serialize};

use crate::error::ConductorError;

pub fn deep_clone<T: Serialize + DeserializeOwned>(value: &T) -> Result<T, ConductorError> {
    let json = serde_json::to_value(value)
        .map_err(|e| ConductorError::Runtime(format!("deep clone serialize failed: {e}")))?;
    serde_json::from_value(json)
        .map_err(|e| ConductorError::Runtime(format!("deep clone deserialize failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Nested {
        values: Vec<String>,
    }

    #[test]
    fn clone_is_independent_of_source() {
        let original = Nested {
            values: vec!["a".into(), "b".into()],
        };
        let mut cloned = deep_clone(&original).unwrap();
        cloned.values.push("c".into());
        assert_eq!(original.values.len(), 2);
        assert_eq!(cloned.values.len(), 3);
    }
}
