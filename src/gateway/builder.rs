//! Builder for configuring Bragi instances

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use super::Bragi;
use crate::cache::{persist, ContentCache, DEFAULT_MAX_AGE, DEFAULT_MAX_SIZE};
use crate::resolver::FallbackResolver;
use crate::traits::ContentSource;
use crate::types::FallbackChains;
use crate::{BragiError, Result};

/// Fields that carry the user-visible substance of a content bundle.
///
/// Used as the default for both the completeness predicate (a bundle with
/// none of these populated is "missing") and the merge-field set.
pub const DEFAULT_CONTENT_FIELDS: [&str; 5] =
    ["title", "content", "description", "name", "excerpt"];

/// Default TTL sweep interval.
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Default debounce window for snapshot saves.
const DEFAULT_SAVE_DEBOUNCE: Duration = Duration::from_secs(2);

/// Builder for configuring [`Bragi`] instances.
///
/// ```rust,no_run
/// # use std::sync::Arc;
/// # use bragi::{Bragi, FallbackChains, Result};
/// # fn example(source: Arc<dyn bragi::ContentSource>) -> Result<Bragi> {
/// Bragi::builder()
///     .source(source)
///     .fallback_chains(FallbackChains::new("vi").chain("tr", ["en", "vi"]))
///     .max_size(100)
///     .build()
/// # }
/// ```
pub struct BragiBuilder {
    source: Option<Arc<dyn ContentSource>>,
    chains: Option<FallbackChains>,
    max_age: Duration,
    max_size: usize,
    required_fields: Vec<String>,
    merge_fields: Vec<String>,
    snapshot_path: Option<PathBuf>,
    persistence: bool,
    sweep_interval: Duration,
    save_debounce: Duration,
}

impl BragiBuilder {
    pub fn new() -> Self {
        Self {
            source: None,
            chains: None,
            max_age: DEFAULT_MAX_AGE,
            max_size: DEFAULT_MAX_SIZE,
            required_fields: DEFAULT_CONTENT_FIELDS.map(String::from).to_vec(),
            merge_fields: DEFAULT_CONTENT_FIELDS.map(String::from).to_vec(),
            snapshot_path: None,
            persistence: true,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            save_debounce: DEFAULT_SAVE_DEBOUNCE,
        }
    }

    /// Set the content source the resolver fetches from. Required.
    pub fn source(mut self, source: Arc<dyn ContentSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Set the fallback chains. Required; validated in [`build`](Self::build).
    pub fn fallback_chains(mut self, chains: FallbackChains) -> Self {
        self.chains = Some(chains);
        self
    }

    /// Maximum entry age before a bundle is treated as expired.
    /// Default: 10 minutes.
    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Maximum number of cached entries. Default: 50.
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Fields the completeness predicate checks; a bundle with none of
    /// them populated counts as missing. Default: [`DEFAULT_CONTENT_FIELDS`].
    pub fn required_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Fields the merger may substitute from a fallback bundle.
    /// Default: [`DEFAULT_CONTENT_FIELDS`].
    pub fn merge_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.merge_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Persist snapshots to a custom path instead of the platform default
    /// (`<cache dir>/bragi/translation-cache.json`).
    pub fn snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    /// Disable snapshot persistence entirely (memory-only cache).
    pub fn no_persistence(mut self) -> Self {
        self.persistence = false;
        self
    }

    /// Interval between TTL sweeps. Default: 60 s.
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Debounce window for snapshot saves under write-heavy load.
    /// Default: 2 s.
    pub fn save_debounce(mut self, debounce: Duration) -> Self {
        self.save_debounce = debounce;
        self
    }

    /// Build the gateway.
    ///
    /// Fails fast on configuration errors — a missing source or chains,
    /// self-referencing chains, an empty required-field set — since those
    /// are programming errors, not runtime conditions. Loads the persisted
    /// snapshot (best effort) before returning.
    pub fn build(self) -> Result<Bragi> {
        let source = self
            .source
            .ok_or_else(|| BragiError::Configuration("no content source configured".into()))?;
        let chains = self
            .chains
            .ok_or_else(|| BragiError::Configuration("no fallback chains configured".into()))?;
        chains.validate()?;

        if self.required_fields.is_empty() {
            return Err(BragiError::Configuration(
                "required-field set is empty; every bundle would count as missing".into(),
            ));
        }
        if self.merge_fields.is_empty() {
            return Err(BragiError::Configuration(
                "merge-field set is empty; fallback bundles could never contribute".into(),
            ));
        }
        if self.max_size == 0 {
            return Err(BragiError::Configuration("max_size must be at least 1".into()));
        }
        if self.max_age.is_zero() {
            return Err(BragiError::Configuration("max_age must be non-zero".into()));
        }

        let cache = Arc::new(ContentCache::new(self.max_age, self.max_size));

        let snapshot_path = self
            .persistence
            .then(|| self.snapshot_path.unwrap_or_else(persist::default_snapshot_path));

        if let Some(path) = &snapshot_path
            && let Some(entries) = persist::load_snapshot(path)
        {
            let loaded = cache.absorb(entries);
            info!(loaded, path = %path.display(), "warmed cache from snapshot");
        }

        let resolver = FallbackResolver::new(
            Arc::clone(&cache),
            source,
            chains,
            self.required_fields,
            self.merge_fields,
        );

        Ok(Bragi::new(
            cache,
            resolver,
            snapshot_path,
            self.sweep_interval,
            self.save_debounce,
        ))
    }
}

impl Default for BragiBuilder {
    fn default() -> Self {
        Self::new()
    }
}
