//! Builder configuration loaded from JSON or the environment.

use std::env;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::registry::OPSET7;

pub const DEFAULT_OPSET_ENV: &str = "OPGRAPH_DEFAULT_OPSET";
pub const INTERN_CONSTANTS_ENV: &str = "OPGRAPH_INTERN_CONSTANTS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Opset used by `create_op` and for constants created by `as_node`.
    pub default_opset: String,
    /// Share one node between unnamed constants with identical type, shape and bytes.
    pub intern_constants: bool,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            default_opset: OPSET7.to_string(),
            intern_constants: true,
        }
    }
}

impl BuilderConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Defaults overridden by `OPGRAPH_DEFAULT_OPSET` and `OPGRAPH_INTERN_CONSTANTS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(opset) = lookup(DEFAULT_OPSET_ENV).filter(|v| !v.trim().is_empty()) {
            config.default_opset = opset.trim().to_string();
        }
        if let Some(value) = lookup(INTERN_CONSTANTS_ENV).filter(|v| !v.trim().is_empty()) {
            config.intern_constants = parse_bool(&value);
        }
        config
    }

    pub fn with_default_opset(mut self, opset: impl Into<String>) -> Self {
        self.default_opset = opset.into();
        self
    }

    pub fn with_intern_constants(mut self, enabled: bool) -> Self {
        self.intern_constants = enabled;
        self
    }
}

fn parse_bool(value: &str) -> bool {
    let normalized = value.trim().to_ascii_lowercase();
    matches!(normalized.as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn lookup_overrides_defaults() {
        let vars = HashMap::from([
            (DEFAULT_OPSET_ENV, " opset1 "),
            (INTERN_CONSTANTS_ENV, "off"),
        ]);
        let config = BuilderConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.default_opset, "opset1");
        assert!(!config.intern_constants);
    }

    #[test]
    fn blank_variables_keep_defaults() {
        let config = BuilderConfig::from_lookup(|_| Some("  ".to_string()));
        assert_eq!(config, BuilderConfig::default());
    }

    #[test]
    fn json_fills_missing_fields() {
        let config = BuilderConfig::from_json_str(r#"{"intern_constants": false}"#).unwrap();
        assert_eq!(config.default_opset, "opset7");
        assert!(!config.intern_constants);
    }

    #[test]
    fn parse_bool_accepts_common_spellings() {
        for value in ["1", "true", "YES", " on "] {
            assert!(parse_bool(value), "{value}");
        }
        for value in ["0", "false", "no", "maybe"] {
            assert!(!parse_bool(value), "{value}");
        }
    }
}
