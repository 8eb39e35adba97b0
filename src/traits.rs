//! Core ContentSource trait

use async_trait::async_trait;

use crate::types::ContentBundle;
use crate::Result;

/// The external content-fetch collaborator.
///
/// Implementations talk to whatever actually holds the localized content —
/// a headless CMS API, a file tree of translation files, a database. The
/// cache and resolver never couple to any of that: they only see this trait.
///
/// Any error returned from [`fetch`](ContentSource::fetch) is treated as
/// "no data for this language" — resolution logs it and proceeds to the
/// next candidate in the fallback chain.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Fetch the content bundle for one `(namespace, language)` pair.
    async fn fetch(&self, namespace: &str, language: &str) -> Result<ContentBundle>;
}
