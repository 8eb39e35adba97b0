//! Bragi - multilingual content cache with fallback resolution
//!
//! This crate provides the content resolution layer for a multilingual
//! site: bundles of localized fields are cached per `(namespace, language)`
//! with LRU eviction, TTL expiry, and best-effort persistence across
//! sessions, and a fallback-chain resolver completes missing or partial
//! translations from other configured languages while preserving
//! provenance.
//!
//! The actual content backend (a headless CMS, translation files, a
//! database) stays outside: implement [`ContentSource`] and hand it to the
//! builder.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use bragi::{Bragi, ContentBundle, ContentSource, FallbackChains, Result};
//!
//! struct CmsSource;
//!
//! #[async_trait]
//! impl ContentSource for CmsSource {
//!     async fn fetch(&self, namespace: &str, language: &str) -> Result<ContentBundle> {
//!         // Talk to the CMS here.
//!         Ok(ContentBundle::new())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let bragi = Bragi::builder()
//!         .source(Arc::new(CmsSource))
//!         .fallback_chains(FallbackChains::new("vi").chain("tr", ["en", "vi"]))
//!         .build()?;
//!     bragi.start_maintenance();
//!
//!     let resolution = bragi.resolve("landing-page", "tr").await;
//!     if resolution.used_fallback {
//!         println!("shown in {}", resolution.language_used);
//!     }
//!
//!     bragi.shutdown();
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod error;
pub mod gateway;
pub mod resolver;
pub mod telemetry;
pub mod traits;
pub mod types;

// Re-export main types at crate root
pub use error::{BragiError, Result};
pub use gateway::{Bragi, BragiBuilder, DEFAULT_CONTENT_FIELDS};
pub use traits::ContentSource;

// Re-export core data types
pub use cache::{CacheEntry, CacheKey, CacheStats, ContentCache, EntryStats};
pub use resolver::FallbackResolver;
pub use types::{ContentBundle, FallbackChains, MergedBundle, Resolution};
