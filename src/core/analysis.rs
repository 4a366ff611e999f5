//! Structured interpretation of a natural-language query.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::agent::capability_key;

/// Intent label used when the query could not be interpreted.
pub const UNKNOWN_INTENT: &str = "unknown";

/// Complexity assumed when none could be determined.
pub const DEFAULT_COMPLEXITY: f64 = 0.5;

/// What a query asks for, in terms the matcher can score against.
///
/// Created once per routed query and not mutated afterwards. Capability
/// sets are ordered so that serialized output is stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAnalysis {
    /// Free-form intent label (e.g. `creation`, `search`).
    pub intent: String,
    /// Capabilities every candidate agent must support.
    #[serde(default, alias = "requiredCapabilities")]
    pub required_capabilities: BTreeSet<String>,
    /// Capabilities that raise an agent's score when present.
    #[serde(default, alias = "optionalCapabilities")]
    pub optional_capabilities: BTreeSet<String>,
    /// Estimated complexity (0.0–1.0).
    #[serde(default = "default_complexity")]
    pub complexity: f64,
}

const fn default_complexity() -> f64 {
    DEFAULT_COMPLEXITY
}

impl QueryAnalysis {
    /// Creates an analysis from raw parts and normalizes it.
    #[must_use]
    pub fn new<R, O, S>(intent: impl Into<String>, required: R, optional: O, complexity: f64) -> Self
    where
        R: IntoIterator<Item = S>,
        O: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            intent: intent.into(),
            required_capabilities: required.into_iter().map(Into::into).collect(),
            optional_capabilities: optional.into_iter().map(Into::into).collect(),
            complexity,
        }
        .normalized()
    }

    /// The analysis used when the query-understanding service is unavailable.
    ///
    /// Carries no capability constraints, so every known agent remains a
    /// candidate.
    #[must_use]
    pub fn degraded() -> Self {
        Self {
            intent: UNKNOWN_INTENT.to_string(),
            required_capabilities: BTreeSet::new(),
            optional_capabilities: BTreeSet::new(),
            complexity: DEFAULT_COMPLEXITY,
        }
    }

    /// Returns `true` if this is the fallback analysis.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.intent == UNKNOWN_INTENT
            && self.required_capabilities.is_empty()
            && self.optional_capabilities.is_empty()
    }

    /// Canonical form of the analysis.
    ///
    /// Capability names are trimmed and lower-cased, blanks are dropped, an
    /// optional capability that is also required is removed from the
    /// optional set, complexity is clamped to `[0, 1]` (`NaN` becomes the
    /// default) and a blank intent becomes [`UNKNOWN_INTENT`].
    #[must_use]
    pub fn normalized(self) -> Self {
        let canon = |set: BTreeSet<String>| -> BTreeSet<String> {
            set.into_iter()
                .map(|c| capability_key(&c))
                .filter(|c| !c.is_empty())
                .collect()
        };

        let required = canon(self.required_capabilities);
        let optional: BTreeSet<String> = canon(self.optional_capabilities)
            .into_iter()
            .filter(|c| !required.contains(c))
            .collect();

        let intent = self.intent.trim();
        let intent = if intent.is_empty() {
            UNKNOWN_INTENT.to_string()
        } else {
            intent.to_string()
        };

        let complexity = if self.complexity.is_nan() {
            DEFAULT_COMPLEXITY
        } else {
            self.complexity.clamp(0.0, 1.0)
        };

        Self {
            intent,
            required_capabilities: required,
            optional_capabilities: optional,
            complexity,
        }
    }
}

impl Default for QueryAnalysis {
    fn default() -> Self {
        Self::degraded()
    }
}
