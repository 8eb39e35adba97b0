//! Fallback resolution — serve the best available language for a bundle.
//!
//! The resolver walks a configured fallback chain when the requested
//! language's bundle is missing per the completeness predicate:
//!
//! ```text
//! User: resolver.resolve("page", "tr")
//!                     │
//!                     ▼
//!         ┌─────────────────────┐
//!         │  cache / fetch "tr" │ ──► complete? return, no fallback
//!         └─────────┬───────────┘
//!                   │ missing
//!                   ▼
//!         ┌─────────────────────┐
//!         │  cache / fetch "en" │ ──► first non-missing candidate wins
//!         │  (chain order)      │
//!         └─────────┬───────────┘
//!                   │ still missing
//!                   ▼
//!         ┌─────────────────────┐
//!         │  default language   │ ──► tried last, unless already tried
//!         └─────────────────────┘
//! ```
//!
//! First match in declared order wins — no completeness scoring, so a
//! resolution is O(chain length) and deterministic. When a fallback wins,
//! the merger combines it with the (possibly partial) primary so populated
//! primary fields always survive.
//!
//! Resolution never fails: a fetch error is logged and the chain moves on;
//! if every candidate comes up empty the caller gets the original primary
//! back, partial or absent, and renders what it can.

pub mod merge;

use std::sync::Arc;

use tracing::{instrument, warn};

use crate::cache::ContentCache;
use crate::telemetry;
use crate::traits::ContentSource;
use crate::types::{ContentBundle, FallbackChains, Resolution};
use merge::{is_missing, merge};

/// Walks fallback chains over the cache and content source.
///
/// Stateless apart from shared handles: bundles are owned by the cache,
/// and the resolver only operates on copies passed through it.
pub struct FallbackResolver {
    cache: Arc<ContentCache>,
    source: Arc<dyn ContentSource>,
    chains: FallbackChains,
    required_fields: Vec<String>,
    merge_fields: Vec<String>,
}

impl FallbackResolver {
    /// Create a resolver. The chains are assumed validated (the builder
    /// rejects invalid configuration before construction).
    pub(crate) fn new(
        cache: Arc<ContentCache>,
        source: Arc<dyn ContentSource>,
        chains: FallbackChains,
        required_fields: Vec<String>,
        merge_fields: Vec<String>,
    ) -> Self {
        Self {
            cache,
            source,
            chains,
            required_fields,
            merge_fields,
        }
    }

    /// Resolve the best available bundle for `(namespace, requested)`.
    ///
    /// Candidate languages are tried strictly in declared chain order, the
    /// default language last; every fetch attempted on the way populates
    /// the cache. See the module docs for the full walk.
    #[instrument(skip(self))]
    pub async fn resolve(&self, namespace: &str, requested: &str) -> Resolution {
        let primary = self.fetch_or_get(namespace, requested).await;

        if let Some(bundle) = &primary
            && !is_missing(bundle, &self.required_fields)
        {
            return Resolution {
                bundle: primary,
                language_used: requested.to_string(),
                used_fallback: false,
            };
        }

        let mut tried: Vec<&str> = vec![requested];
        let default = self.chains.default_language();
        let order = self
            .chains
            .candidates_for(requested)
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(default));

        for candidate in order {
            if tried.contains(&candidate) {
                continue;
            }
            tried.push(candidate);

            let Some(fallback) = self.fetch_or_get(namespace, candidate).await else {
                continue;
            };
            if is_missing(&fallback, &self.required_fields) {
                continue;
            }

            metrics::counter!(
                telemetry::FALLBACKS_TOTAL,
                "language" => candidate.to_owned()
            )
            .increment(1);

            let merged = merge(primary, Some(fallback), candidate, &self.merge_fields);
            return Resolution {
                bundle: merged.map(|m| m.fields),
                language_used: candidate.to_string(),
                used_fallback: true,
            };
        }

        // Chain exhausted: hand back whatever the requested language had.
        // Callers render partial content rather than fail.
        Resolution {
            bundle: primary,
            language_used: requested.to_string(),
            used_fallback: false,
        }
    }

    /// Warm the cache for every `(namespace, language)` pair.
    ///
    /// Pairs are fetched concurrently and joined at the end; one pair's
    /// failure never cancels the others. Returns the number of bundles
    /// actually fetched (already-cached pairs are counted as hits and
    /// skipped).
    pub async fn preload(&self, namespaces: &[String], languages: &[String]) -> usize {
        let mut tasks = Vec::with_capacity(namespaces.len() * languages.len());
        for namespace in namespaces {
            for language in languages {
                tasks.push(async move {
                    if self.cache.lookup(namespace, language).is_some() {
                        return false;
                    }
                    self.fetch_into_cache(namespace, language).await.is_some()
                });
            }
        }
        let results = futures_util::future::join_all(tasks).await;
        results.into_iter().filter(|loaded| *loaded).count()
    }

    /// Cache lookup with fetch-on-miss.
    async fn fetch_or_get(&self, namespace: &str, language: &str) -> Option<ContentBundle> {
        if let Some(bundle) = self.cache.lookup(namespace, language) {
            return Some(bundle);
        }
        self.fetch_into_cache(namespace, language).await
    }

    /// Fetch from the source and populate the cache.
    ///
    /// Miss accounting happens only after the fetch completes, and a
    /// failed fetch stores nothing — so a caller dropping this future
    /// mid-flight leaves both the cache and the statistics untouched.
    async fn fetch_into_cache(&self, namespace: &str, language: &str) -> Option<ContentBundle> {
        match self.source.fetch(namespace, language).await {
            Ok(bundle) => {
                self.cache.record_miss();
                metrics::counter!(telemetry::FETCHES_TOTAL, "status" => "ok").increment(1);
                self.cache.put(namespace, language, bundle.clone());
                Some(bundle)
            }
            Err(e) => {
                self.cache.record_miss();
                metrics::counter!(telemetry::FETCHES_TOTAL, "status" => "error").increment(1);
                warn!(namespace, language, error = %e, "content fetch failed, trying next candidate");
                None
            }
        }
    }
}
