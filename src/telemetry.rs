//! Telemetry metric name constants.
//!
//! Centralised metric names for bragi operations. Consumers install their
//! own `metrics` recorder (e.g. prometheus, statsd); without a recorder
//! installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `bragi_`. Counters end in `_total`.
//!
//! # Common labels
//!
//! - `status` — outcome: "ok" or "error"
//! - `language` — language code of the bundle involved

/// Total live cache hits.
pub const CACHE_HITS_TOTAL: &str = "bragi_cache_hits_total";

/// Total cache misses (including entries treated as absent due to age).
pub const CACHE_MISSES_TOTAL: &str = "bragi_cache_misses_total";

/// Total entries removed by LRU eviction.
pub const CACHE_EVICTIONS_TOTAL: &str = "bragi_cache_evictions_total";

/// Total entries removed by the TTL sweep.
pub const CACHE_EXPIRATIONS_TOTAL: &str = "bragi_cache_expirations_total";

/// Total fetches dispatched to the content source.
///
/// Labels: `status` ("ok" | "error").
pub const FETCHES_TOTAL: &str = "bragi_fetches_total";

/// Total resolutions that returned a fallback language's bundle.
///
/// Labels: `language` — the fallback language that was used.
pub const FALLBACKS_TOTAL: &str = "bragi_fallbacks_total";

/// Total snapshot writes attempted by the persister.
///
/// Labels: `status` ("ok" | "error").
pub const SNAPSHOT_SAVES_TOTAL: &str = "bragi_snapshot_saves_total";
