use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use mission_saga::RetryPolicy;
use serde::Deserialize;

use crate::{OperationError, Result};

/// Retry settings for one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct StepSettings {
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default)]
    pub retry_delay_ms: u64,
}

impl StepSettings {
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_millis(self.max_retries, self.retry_delay_ms)
    }
}

fn default_feed_enabled() -> bool {
    true
}

/// Tuning for mission completion, usually read from `mission-completion.toml`.
///
/// ```toml
/// feed-enabled = true
///
/// [steps.grant-guild-experience]
/// max-retries = 2
/// retry-delay-ms = 50
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct CompletionConfig {
    #[serde(default = "default_feed_enabled")]
    pub feed_enabled: bool,
    /// Per-step settings keyed by step name, in file order.
    #[serde(default)]
    pub steps: IndexMap<String, StepSettings>,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            feed_enabled: true,
            steps: IndexMap::new(),
        }
    }
}

impl CompletionConfig {
    /// # Errors
    ///
    /// Returns `OperationError::ConfigParse` if the content is not a valid
    /// completion config.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|source| OperationError::ConfigParse {
            origin: "<inline>".to_string(),
            source,
        })
    }

    /// # Errors
    ///
    /// Returns `OperationError::ConfigRead` if the file cannot be read and
    /// `OperationError::ConfigParse` if its content is invalid.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| OperationError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| OperationError::ConfigParse {
            origin: path.display().to_string(),
            source,
        })
    }

    /// Adds or replaces the retry settings of one step.
    #[must_use]
    pub fn with_step(mut self, step_name: &str, settings: StepSettings) -> Self {
        self.steps.insert(normalize_step_name(step_name), settings);
        self
    }

    /// Retry overrides keyed by `snake_case` step name.
    #[must_use]
    pub fn retry_overrides(&self) -> Vec<(String, RetryPolicy)> {
        self.steps
            .iter()
            .map(|(name, settings)| (normalize_step_name(name), settings.retry_policy()))
            .collect()
    }

    /// # Errors
    ///
    /// Returns `OperationError::UnknownStep` for the first configured step
    /// that is not one of `known`.
    pub fn validate(&self, known: &[&str]) -> Result<()> {
        for name in self.steps.keys() {
            let normalized = normalize_step_name(name);
            if !known.contains(&normalized.as_str()) {
                return Err(OperationError::UnknownStep {
                    step: name.clone(),
                    known: known.join(", "),
                });
            }
        }
        Ok(())
    }
}

/// Config files name steps in kebab-case; steps report `snake_case`.
fn normalize_step_name(name: &str) -> String {
    name.trim().to_ascii_lowercase().replace('-', "_")
}
