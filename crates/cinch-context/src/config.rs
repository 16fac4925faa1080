//! Host configuration consumed by the context window guard.
//!
//! Only the slice of the host's configuration this crate reads is modelled
//! here: per-provider model definitions (for `contextWindow` overrides) and
//! the agent-wide `contextTokens` cap. Everything else in the host's config
//! file is ignored during deserialization.
//!
//! # Example JSON
//!
//! ```json
//! {
//!   "models": {
//!     "providers": {
//!       "openrouter": {
//!         "models": [{ "id": "z-ai/glm-5", "contextWindow": 128000 }]
//!       }
//!     }
//!   },
//!   "agents": { "defaults": { "contextTokens": 100000 } }
//! }
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Root of the host configuration.
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub agents: AgentsConfig,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct ModelsConfig {
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct ProviderConfig {
    #[serde(default)]
    pub models: Vec<ModelDefinition>,
}

/// A model entry under a provider. `context_window` is kept as a raw
/// number so malformed values (fractions, negatives) can be ignored
/// instead of failing the whole config.
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ModelDefinition {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_window: Option<f64>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct AgentsConfig {
    #[serde(default)]
    pub defaults: AgentDefaults,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct AgentDefaults {
    /// Agent-wide cap on the context window. Can only shrink the window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_tokens: Option<f64>,
}

impl EngineConfig {
    /// Parse a config from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a config from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    /// Look up the configured `contextWindow` for `provider` / `model_id`.
    ///
    /// Returns the raw configured number; callers normalize it.
    pub fn model_context_window(&self, provider: &str, model_id: &str) -> Option<f64> {
        self.models
            .providers
            .get(provider)?
            .models
            .iter()
            .find(|m| m.id == model_id)?
            .context_window
    }

    /// Add a model definition (builder pattern, mostly for tests and
    /// programmatic hosts).
    pub fn with_model(
        mut self,
        provider: impl Into<String>,
        model_id: impl Into<String>,
        context_window: f64,
    ) -> Self {
        self.models
            .providers
            .entry(provider.into())
            .or_default()
            .models
            .push(ModelDefinition {
                id: model_id.into(),
                context_window: Some(context_window),
            });
        self
    }

    /// Set the agent-wide context token cap (builder pattern).
    pub fn with_context_tokens(mut self, tokens: f64) -> Self {
        self.agents.defaults.context_tokens = Some(tokens);
        self
    }
}

/// Normalize a configured number to a positive integer.
///
/// Non-finite values and values whose floor is not positive yield `None`.
pub fn normalize_positive_int(value: f64) -> Option<u64> {
    if !value.is_finite() {
        return None;
    }
    let floored = value.floor();
    (floored >= 1.0).then_some(floored as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_nested_json() {
        let cfg = EngineConfig::from_json_str(
            r#"{
                "models": {"providers": {"openrouter": {"models": [
                    {"id": "z-ai/glm-5", "contextWindow": 128000},
                    {"id": "other"}
                ]}}},
                "agents": {"defaults": {"contextTokens": 64000}},
                "channels": {"ignored": true}
            }"#,
        )
        .unwrap();
        assert_eq!(
            cfg.model_context_window("openrouter", "z-ai/glm-5"),
            Some(128_000.0)
        );
        assert_eq!(cfg.model_context_window("openrouter", "other"), None);
        assert_eq!(cfg.model_context_window("anthropic", "z-ai/glm-5"), None);
        assert_eq!(cfg.agents.defaults.context_tokens, Some(64_000.0));
    }

    #[test]
    fn empty_object_is_default() {
        let cfg = EngineConfig::from_json_str("{}").unwrap();
        assert!(cfg.models.providers.is_empty());
        assert!(cfg.agents.defaults.context_tokens.is_none());
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let err = EngineConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"agents": {{"defaults": {{"contextTokens": 20000}}}}}}"#
        )
        .unwrap();
        let cfg = EngineConfig::load(file.path()).unwrap();
        assert_eq!(cfg.agents.defaults.context_tokens, Some(20_000.0));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = EngineConfig::load(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("missing.json"));
    }

    #[test]
    fn normalize_positive_int_floors_and_rejects() {
        assert_eq!(normalize_positive_int(8000.0), Some(8000));
        assert_eq!(normalize_positive_int(8000.9), Some(8000));
        assert_eq!(normalize_positive_int(0.5), None);
        assert_eq!(normalize_positive_int(0.0), None);
        assert_eq!(normalize_positive_int(-5.0), None);
        assert_eq!(normalize_positive_int(f64::NAN), None);
        assert_eq!(normalize_positive_int(f64::INFINITY), None);
    }
}
