//! Bragi gateway — the consumer-facing surface.
//!
//! [`Bragi`] owns the cache, the resolver, and the maintenance tasks, and
//! is the explicitly constructed instance that replaces the module-scoped
//! singleton the original UI layer shared between call sites. Create one
//! at application startup via [`Bragi::builder()`], share it by reference
//! (or `Arc`), and call [`shutdown`](Bragi::shutdown) on the way out so
//! the final snapshot lands on disk.

mod builder;
pub mod maintenance;

pub use builder::{BragiBuilder, DEFAULT_CONTENT_FIELDS};

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{info, warn};

use crate::cache::{persist, CacheStats, ContentCache};
use crate::resolver::FallbackResolver;
use crate::types::{ContentBundle, Resolution};
use crate::Result;
use maintenance::MaintenanceTasks;

/// Multilingual content cache with fallback-chain resolution.
///
/// All methods take `&self`; the cache is internally synchronized and the
/// resolver is stateless, so one instance serves any number of concurrent
/// tasks.
pub struct Bragi {
    cache: Arc<ContentCache>,
    resolver: FallbackResolver,
    snapshot_path: Option<PathBuf>,
    sweep_interval: Duration,
    save_debounce: Duration,
    maintenance: Mutex<Option<MaintenanceTasks>>,
}

impl std::fmt::Debug for Bragi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bragi")
            .field("snapshot_path", &self.snapshot_path)
            .field("sweep_interval", &self.sweep_interval)
            .field("save_debounce", &self.save_debounce)
            .finish_non_exhaustive()
    }
}

impl Bragi {
    /// Create a new builder for configuring an instance.
    pub fn builder() -> BragiBuilder {
        BragiBuilder::new()
    }

    pub(crate) fn new(
        cache: Arc<ContentCache>,
        resolver: FallbackResolver,
        snapshot_path: Option<PathBuf>,
        sweep_interval: Duration,
        save_debounce: Duration,
    ) -> Self {
        Self {
            cache,
            resolver,
            snapshot_path,
            sweep_interval,
            save_debounce,
            maintenance: Mutex::new(None),
        }
    }

    /// Resolve the best available bundle for `(namespace, language)`.
    ///
    /// Never fails: worst case is the original, possibly partial, bundle
    /// with `used_fallback = false`. See [`FallbackResolver::resolve`].
    pub async fn resolve(&self, namespace: &str, language: &str) -> Resolution {
        self.resolver.resolve(namespace, language).await
    }

    /// Warm the cache for every `(namespace, language)` pair. Returns the
    /// number of bundles actually fetched. See [`FallbackResolver::preload`].
    pub async fn preload(&self, namespaces: &[String], languages: &[String]) -> usize {
        self.resolver.preload(namespaces, languages).await
    }

    /// Direct cache lookup, without fetch or fallback.
    pub fn get(&self, namespace: &str, language: &str) -> Option<ContentBundle> {
        self.cache.get(namespace, language)
    }

    /// Directly insert a bundle, bypassing the content source.
    pub fn put(&self, namespace: &str, language: &str, data: ContentBundle) {
        self.cache.put(namespace, language, data);
    }

    /// Invalidate one `(namespace, language)` entry.
    pub fn remove(&self, namespace: &str, language: &str) -> bool {
        self.cache.remove(namespace, language)
    }

    /// Invalidate every language's bundle for one namespace.
    pub fn invalidate_namespace(&self, namespace: &str) -> usize {
        self.cache.invalidate_namespace(namespace)
    }

    /// Drop all cached entries and reset counters.
    pub fn clear(&self) {
        self.cache.clear();
    }

    /// Cache counters and per-entry bookkeeping.
    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// The underlying cache, for callers wiring their own maintenance.
    pub fn cache(&self) -> &Arc<ContentCache> {
        &self.cache
    }

    /// Write a snapshot to disk right now, bypassing the debounce.
    ///
    /// No-op when persistence is disabled.
    pub fn flush(&self) -> Result<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        self.cache.dirty_signal().take();
        persist::save_snapshot(path, self.cache.export())
    }

    /// Spawn the background sweeper and (when persistence is enabled)
    /// the debounced persister.
    ///
    /// Must be called from within a tokio runtime. Calling it again while
    /// tasks are already running is a no-op.
    pub fn start_maintenance(&self) {
        let mut guard = self
            .maintenance
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if guard.is_some() {
            return;
        }
        *guard = Some(maintenance::spawn(
            Arc::clone(&self.cache),
            self.snapshot_path.clone(),
            self.sweep_interval,
            self.save_debounce,
        ));
        info!(
            sweep_interval_secs = self.sweep_interval.as_secs(),
            persistence = self.snapshot_path.is_some(),
            "started cache maintenance tasks"
        );
    }

    /// Stop maintenance tasks and flush the final snapshot.
    ///
    /// Persistence failures are logged, not returned — shutdown proceeds
    /// regardless.
    pub fn shutdown(&self) {
        if let Some(tasks) = self
            .maintenance
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take()
        {
            tasks.abort();
        }
        if let Err(e) = self.flush() {
            warn!(error = %e, "final snapshot flush failed");
        }
        info!("bragi shut down");
    }
}
