//! Fallback chain configuration and validation.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::{BragiError, Result};

/// Per-language fallback chains plus the terminal default language.
///
/// Each chain maps a requested language to an ordered list of secondary
/// languages to try when the requested bundle is missing. The default
/// language terminates every chain and is assumed always available.
///
/// Used both programmatically and from config files:
///
/// ```toml
/// default_language = "vi"
///
/// [chains]
/// tr = ["en", "vi"]
/// en = ["vi"]
/// ```
///
/// ```rust
/// # use bragi::FallbackChains;
/// let chains = FallbackChains::new("vi")
///     .chain("tr", ["en", "vi"])
///     .chain("en", ["vi"]);
/// assert!(chains.validate().is_ok());
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct FallbackChains {
    /// Requested language → ordered secondary candidates.
    #[serde(default)]
    chains: BTreeMap<String, Vec<String>>,
    /// Terminal language tried after the secondaries are exhausted.
    default_language: String,
}

impl FallbackChains {
    /// Create chains with only a default language configured.
    pub fn new(default_language: impl Into<String>) -> Self {
        Self {
            chains: BTreeMap::new(),
            default_language: default_language.into(),
        }
    }

    /// Add (or replace) the secondary candidate list for one language.
    pub fn chain<I, S>(mut self, language: impl Into<String>, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.chains
            .insert(language.into(), candidates.into_iter().map(Into::into).collect());
        self
    }

    /// The ordered secondary candidates for `language` (empty if none
    /// configured — the default language still applies).
    pub fn candidates_for(&self, language: &str) -> &[String] {
        self.chains.get(language).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The terminal default language.
    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    /// Validate the configuration. Called by the builder at startup;
    /// violations are programming errors and fail fast.
    ///
    /// Rules:
    /// - the default language must be non-empty (every chain must terminate)
    /// - a language must not appear in its own secondary list (self-reference
    ///   would loop)
    /// - candidate entries must be non-empty strings
    pub fn validate(&self) -> Result<()> {
        if self.default_language.trim().is_empty() {
            return Err(BragiError::Configuration(
                "fallback chains have no default language".into(),
            ));
        }
        for (language, candidates) in &self.chains {
            if language.trim().is_empty() {
                return Err(BragiError::Configuration(
                    "fallback chain configured for an empty language code".into(),
                ));
            }
            for candidate in candidates {
                if candidate.trim().is_empty() {
                    return Err(BragiError::Configuration(format!(
                        "fallback chain for '{language}' contains an empty candidate"
                    )));
                }
                if candidate == language {
                    return Err(BragiError::Configuration(format!(
                        "fallback chain for '{language}' references itself"
                    )));
                }
            }
        }
        Ok(())
    }
}
