//! Deterministic merging of per-agent responses.
//!
//! The highest-ranked successful response is the primary answer. Every other
//! success is kept and appended as supplementary detail, labelled with how
//! it relates to the primary one. Failures are listed, never hidden.

use std::collections::BTreeSet;
use std::fmt::Write;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::core::AgentResponse;

/// Word-set similarity at or above which two answers are said to concur.
pub const CONCUR_THRESHOLD: f64 = 0.8;

#[allow(clippy::expect_used)]
static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}\p{N}]+").expect("word pattern is a valid regex"));

#[allow(clippy::expect_used)]
static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:[.,]\d+)*").expect("number pattern is a valid regex"));

/// How a supplementary answer relates to the primary one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Agreement {
    /// Says essentially the same thing.
    Concurs,
    /// Adds information without contradicting key figures.
    Complements,
    /// Reports different figures for the same question.
    Conflicts,
}

impl Agreement {
    /// Classifies `other` against `primary`.
    ///
    /// Two texts concur when the Jaccard similarity of their lower-cased word
    /// sets reaches [`CONCUR_THRESHOLD`]. They conflict when both mention
    /// numbers and share none. Anything else complements.
    #[must_use]
    pub fn classify(primary: &str, other: &str) -> Self {
        if jaccard(&words(primary), &words(other)) >= CONCUR_THRESHOLD {
            return Self::Concurs;
        }

        let (a, b) = (numbers(primary), numbers(other));
        if !a.is_empty() && !b.is_empty() && a.is_disjoint(&b) {
            return Self::Conflicts;
        }

        Self::Complements
    }

    /// Returns the label used in synthesized output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Concurs => "concurs",
            Self::Complements => "complements",
            Self::Conflicts => "conflicts",
        }
    }
}

impl std::fmt::Display for Agreement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn tokens(re: &Regex, text: &str) -> BTreeSet<String> {
    re.find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .collect()
}

fn words(text: &str) -> BTreeSet<String> {
    tokens(&WORD, text)
}

fn numbers(text: &str) -> BTreeSet<String> {
    tokens(&NUMBER, text)
}

#[allow(clippy::cast_precision_loss)]
fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 1.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Fourth pipeline stage: per-agent responses → one answer.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultSynthesizer;

impl ResultSynthesizer {
    /// Creates a synthesizer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Message returned when nothing was dispatched.
    #[must_use]
    pub fn no_agents_message(query: &str) -> String {
        format!("No agent was available to handle the query \"{query}\".")
    }

    fn all_failed_message(responses: &[AgentResponse], query: &str) -> String {
        let mut out = format!(
            "The query \"{query}\" could not be completed: none of the {} dispatched agents returned a result.\n",
            responses.len()
        );
        Self::write_failures(&mut out, responses);
        out
    }

    fn write_failures(out: &mut String, responses: &[AgentResponse]) {
        let failed: Vec<_> = responses.iter().filter(|r| !r.is_success()).collect();
        if failed.is_empty() {
            return;
        }
        out.push_str("\nFailed agents:\n");
        for r in failed {
            let _ = writeln!(out, "- {}: {}", r.agent_id, r.error().unwrap_or_default());
        }
    }

    /// Merges `responses`, given in ranking order, into one answer.
    ///
    /// - no responses: a "no agent available" message
    /// - no successes: a failure message listing every agent's error
    /// - one success: that content, verbatim
    /// - several: the first success, then every other success as
    ///   supplementary detail with its [`Agreement`], then attribution
    #[must_use]
    pub fn synthesize(&self, responses: &[AgentResponse], query: &str) -> String {
        if responses.is_empty() {
            return Self::no_agents_message(query);
        }

        let successes: Vec<(&str, String)> = responses
            .iter()
            .filter_map(|r| r.content_text().map(|text| (r.agent_id.as_str(), text)))
            .collect();

        let Some(((primary_id, primary), rest)) = successes.split_first() else {
            return Self::all_failed_message(responses, query);
        };

        if rest.is_empty() {
            return primary.clone();
        }

        let mut out = primary.clone();
        out.push_str("\n\n---\n\nSupplementary detail:\n");
        for (agent_id, text) in rest {
            let agreement = Agreement::classify(primary, text);
            let _ = write!(out, "\n[{agent_id}, {agreement}]\n{text}\n");
        }

        let others: Vec<&str> = rest.iter().map(|(id, _)| *id).collect();
        let _ = write!(
            out,
            "\nSources: {primary_id} (primary), {}\n",
            others.join(", ")
        );
        Self::write_failures(&mut out, responses);

        out
    }

    /// The highest-ranked successful content, unmerged.
    ///
    /// Falls back to the same messages as [`synthesize`](Self::synthesize)
    /// when nothing succeeded.
    #[must_use]
    pub fn primary_only(&self, responses: &[AgentResponse], query: &str) -> String {
        if responses.is_empty() {
            return Self::no_agents_message(query);
        }
        responses
            .iter()
            .find_map(AgentResponse::content_text)
            .unwrap_or_else(|| Self::all_failed_message(responses, query))
    }
}
