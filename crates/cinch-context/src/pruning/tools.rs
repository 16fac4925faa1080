//! Tool-name matching for pruning eligibility.
//!
//! Some tool results must never be trimmed (e.g. memory recalls the model
//! relies on verbatim). [`ToolMatcher`] compiles the `allow` / `deny` glob
//! lists from [`ToolMatchSettings`] once, when the session runtime is built,
//! so the per-turn check is a set lookup.

use super::settings::ToolMatchSettings;
use crate::error::ConfigError;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::sync::Arc;

/// Shared "may this tool's result be pruned?" predicate.
pub type ToolPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Compiled allow / deny lists.
#[derive(Debug, Clone)]
pub struct ToolMatcher {
    allow: Option<GlobSet>,
    deny: Option<GlobSet>,
}

impl ToolMatcher {
    /// Compile the patterns in `settings`. Blank patterns are ignored.
    pub fn compile(settings: &ToolMatchSettings) -> Result<Self, ConfigError> {
        Ok(Self {
            allow: build_set(&settings.allow)?,
            deny: build_set(&settings.deny)?,
        })
    }

    /// Whether results from `tool_name` may be pruned. Deny wins; with no
    /// allow patterns every non-denied tool is prunable.
    pub fn is_prunable(&self, tool_name: &str) -> bool {
        let name = tool_name.trim();
        if self.deny.as_ref().is_some_and(|deny| deny.is_match(name)) {
            return false;
        }
        self.allow.as_ref().is_none_or(|allow| allow.is_match(name))
    }

    pub fn into_predicate(self) -> ToolPredicate {
        Arc::new(move |name: &str| self.is_prunable(name))
    }
}

fn build_set(patterns: &[String]) -> Result<Option<GlobSet>, ConfigError> {
    let mut builder = GlobSetBuilder::new();
    let mut count = 0;
    for raw in patterns {
        let pattern = raw.trim();
        if pattern.is_empty() {
            continue;
        }
        let glob = GlobBuilder::new(pattern)
            .case_insensitive(true)
            .literal_separator(false)
            .build()
            .map_err(|source| ConfigError::InvalidToolPattern {
                pattern: pattern.to_string(),
                source,
            })?;
        builder.add(glob);
        count += 1;
    }
    if count == 0 {
        return Ok(None);
    }
    let set = builder
        .build()
        .map_err(|source| ConfigError::InvalidToolPattern {
            pattern: patterns.join(", "),
            source,
        })?;
    Ok(Some(set))
}
