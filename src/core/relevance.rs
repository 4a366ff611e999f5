//! Relevance score for ranked agents.
//!
//! Scores live in `core` so the matcher, the CLI, and callers that
//! post-filter search results share one definition of the bounds and the
//! ordering. A score is always a finite value in `[0.0, 1.0]`.

use std::cmp::Ordering;

use serde::{Deserialize, Deserializer, Serialize};

/// Score every agent receives once it satisfies all required capabilities.
pub const BASE_SCORE: f64 = 0.7;

/// Weight of optional-capability coverage on top of [`BASE_SCORE`].
pub const OPTIONAL_WEIGHT: f64 = 0.3;

/// Bonus applied to agents the caller listed as preferred.
pub const PREFERENCE_BOOST: f64 = 0.2;

/// Relevance of an agent to a query, clamped to `[0.0, 1.0]`.
///
/// Ordering uses [`f64::total_cmp`] on the clamped value, so sorting a list
/// of scores is total and deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RelevanceScore(f64);

impl RelevanceScore {
    /// The lowest possible score.
    pub const MIN: Self = Self(0.0);
    /// The highest possible score.
    pub const MAX: Self = Self(1.0);

    /// Creates a score, clamping into range. `NaN` becomes `0.0`.
    #[must_use]
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            Self::MIN
        } else {
            Self(value.clamp(0.0, 1.0))
        }
    }

    /// Score for a candidate that covers `matched` of `requested` optional
    /// capabilities.
    ///
    /// With no optional capabilities requested, coverage contributes nothing
    /// and the result is exactly [`BASE_SCORE`].
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_optional_coverage(matched: usize, requested: usize) -> Self {
        let coverage = matched.min(requested) as f64 / requested.max(1) as f64;
        Self::new(OPTIONAL_WEIGHT.mul_add(coverage, BASE_SCORE))
    }

    /// Returns this score raised by [`PREFERENCE_BOOST`], capped at `1.0`.
    #[must_use]
    pub fn boosted(self) -> Self {
        Self::new(self.0 + PREFERENCE_BOOST)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }
}

impl Default for RelevanceScore {
    fn default() -> Self {
        Self::MIN
    }
}

impl Eq for RelevanceScore {}

impl PartialOrd for RelevanceScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RelevanceScore {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl From<f64> for RelevanceScore {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl<'de> Deserialize<'de> for RelevanceScore {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        f64::deserialize(deserializer).map(Self::new)
    }
}

impl std::fmt::Display for RelevanceScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}
