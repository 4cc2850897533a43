//! Configuration management for draftloop.
//!
//! Settings live in `<project>/.draftloop/settings.json`. Every key is
//! optional; a missing file means defaults throughout.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{DraftError, Result};
use crate::generator::GeneratorConfig;
use crate::session::satisfaction::{KeywordPredicate, DEFAULT_KEYWORDS};

fn default_keywords() -> Vec<String> {
    DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect()
}

/// Project-level configuration.
///
/// # Example settings.json
///
/// ```json
/// {
///   "generator": { "provider": "groq", "temperature": 0.5 },
///   "satisfactionKeywords": ["satisfied", "good", "approved"],
///   "maxRevisions": 10
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftConfig {
    /// Generator backend settings.
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Words that end the feedback loop when found in the user's reply.
    #[serde(default = "default_keywords")]
    pub satisfaction_keywords: Vec<String>,

    /// Ceiling on revisions; unbounded when absent.
    #[serde(default)]
    pub max_revisions: Option<u32>,
}

impl Default for DraftConfig {
    fn default() -> Self {
        Self {
            generator: GeneratorConfig::default(),
            satisfaction_keywords: default_keywords(),
            max_revisions: None,
        }
    }
}

impl DraftConfig {
    /// Load configuration from a project directory.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError::Config`] naming the file if it exists but
    /// cannot be read or parsed.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let settings_path = Self::settings_path(project_dir);

        if !settings_path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&settings_path).map_err(|e| {
            DraftError::config_with_path(format!("failed to read: {}", e), settings_path.clone())
        })?;
        serde_json::from_str(&content).map_err(|e| {
            DraftError::config_with_path(
                format!("failed to parse {}: {}", settings_path.display(), e),
                settings_path,
            )
        })
    }

    /// Get the settings.json path for a project
    pub fn settings_path(project_dir: &Path) -> PathBuf {
        project_dir.join(".draftloop/settings.json")
    }

    /// Check every setting and collect the problems.
    pub fn validate(&self) -> Vec<(String, String)> {
        let mut problems = self.generator.validate();

        if self.satisfaction_keywords.is_empty() {
            problems.push((
                "satisfactionKeywords".to_string(),
                "at least one keyword is required".to_string(),
            ));
        }
        if self.satisfaction_keywords.iter().any(|k| k.trim().is_empty()) {
            problems.push((
                "satisfactionKeywords".to_string(),
                "keywords must not be blank".to_string(),
            ));
        }
        if self.max_revisions == Some(0) {
            problems.push((
                "maxRevisions".to_string(),
                "must be positive or omitted".to_string(),
            ));
        }

        problems
    }

    /// Like [`validate`](Self::validate), but fails on the first problem.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError::InvalidConfig`] for the first problem found.
    pub fn ensure_valid(&self) -> Result<()> {
        match self.validate().into_iter().next() {
            Some((field, reason)) => Err(DraftError::invalid_config(field, reason)),
            None => Ok(()),
        }
    }

    /// Satisfaction predicate built from the configured keywords.
    pub fn predicate(&self) -> KeywordPredicate {
        KeywordPredicate::new(&self.satisfaction_keywords)
    }
}
