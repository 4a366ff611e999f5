//! System prompt and message builder for LLM-backed query analysis.
//!
//! The analyzer prompt is compiled in and may be overridden by an
//! `analyzer.md` template in the prompt directory.

use std::path::{Path, PathBuf};

/// System prompt for the query analyzer.
pub const ANALYZER_SYSTEM_PROMPT: &str = r#"You are a query analyst for an agent routing service. Independent agents each advertise a set of capabilities (for example `image_processing`, `text_processing`, `code_generation`, `data_analysis`, `search`, `summarization`, `general_knowledge`). Your job is to work out what a user query needs so it can be sent to the agents able to answer it.

## Instructions

1. Identify the primary intent of the query as a short lowercase label (for example `creation`, `search`, `analysis`, `summarization`, `information`).
2. List the capabilities an agent MUST have to fulfil the query. Keep this list minimal: every entry excludes agents that lack it.
3. List capabilities that would improve the answer but are not strictly needed.
4. Estimate the complexity of the query on a 0-1 scale, where 0 is a one-step lookup and 1 is open-ended multi-step reasoning.

Use lowercase snake_case capability names. Do not repeat a required capability in the optional list.

## Output Format (JSON)

```json
{
  "intent": "creation",
  "requiredCapabilities": ["image_processing"],
  "optionalCapabilities": ["upscaling"],
  "complexity": 0.4
}
```

Respond with the JSON object only."#;

/// Default prompt directory relative to the user's config directory.
const DEFAULT_PROMPT_DIR: &str = "compass-rs/prompts";

/// Filename for the analyzer prompt template.
const ANALYZER_FILENAME: &str = "analyzer.md";

/// System prompts used by the routing pipeline.
#[derive(Debug, Clone)]
pub struct PromptSet {
    /// System prompt for the LLM query analyzer.
    pub analyzer: String,
}

impl PromptSet {
    /// Loads prompts from the given directory, falling back to compiled-in defaults.
    ///
    /// Resolution order for `prompt_dir`:
    /// 1. Explicit `prompt_dir` argument
    /// 2. `COMPASS_PROMPT_DIR` environment variable
    /// 3. `<config dir>/compass-rs/prompts/`
    #[must_use]
    pub fn load(prompt_dir: Option<&Path>) -> Self {
        let resolved_dir = prompt_dir
            .map(PathBuf::from)
            .or_else(|| std::env::var("COMPASS_PROMPT_DIR").ok().map(PathBuf::from))
            .or_else(Self::default_dir);

        let analyzer = resolved_dir
            .as_ref()
            .map(|dir| dir.join(ANALYZER_FILENAME))
            .and_then(|path| std::fs::read_to_string(&path).ok())
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| ANALYZER_SYSTEM_PROMPT.to_string());

        Self { analyzer }
    }

    /// Returns compiled-in defaults without checking the filesystem.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            analyzer: ANALYZER_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Writes the compiled-in default prompts to the given directory.
    ///
    /// Creates the directory if it does not exist. Existing files are
    /// **not** overwritten.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if directory creation or file writing fails.
    pub fn write_defaults(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;

        let mut written = Vec::new();
        let path = dir.join(ANALYZER_FILENAME);
        if !path.exists() {
            std::fs::write(&path, ANALYZER_SYSTEM_PROMPT)?;
            written.push(path);
        }

        Ok(written)
    }

    /// Returns the default prompt directory under the user's config directory.
    ///
    /// Returns `None` if the config directory cannot be determined.
    #[must_use]
    pub fn default_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(DEFAULT_PROMPT_DIR))
    }
}

/// Builds the user message for the query analyzer.
#[must_use]
pub fn build_analyzer_prompt(query: &str) -> String {
    format!("<query>{query}</query>\n\nAnalyze this query.")
}
