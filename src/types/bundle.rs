//! Content bundle types and field emptiness semantics.

use std::collections::BTreeMap;

use serde_json::Value;

/// A content bundle: the set of field values for one `(namespace, language)`
/// pair. Values may be nested JSON; the cache treats them as opaque.
pub type ContentBundle = BTreeMap<String, Value>;

/// Whether a field value counts as empty for completeness and merge purposes.
///
/// Empty means: JSON `null`, or a string that is empty or whitespace-only.
/// Everything else — numbers, booleans, arrays, objects, non-blank strings —
/// counts as present, even `[]` and `{}` (the source put them there on
/// purpose; second-guessing nested structures is not this layer's job).
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Result of merging a primary bundle with a fallback bundle.
///
/// `used_fallback_language` is `Some` only when at least one field was
/// actually substituted from the fallback, so callers can show a
/// "shown in language X" indicator without diffing bundles themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedBundle {
    /// The merged field values.
    pub fields: ContentBundle,
    /// Language the substituted fields came from, if any were substituted.
    pub used_fallback_language: Option<String>,
}

/// Outcome of a fallback resolution.
///
/// `bundle` is `None` only when neither the requested language nor any
/// chain candidate produced data at all. `used_fallback` is the signal for
/// a UI-side "shown in language X" indicator; a successful fallback is not
/// an error and none is reported.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Best available bundle, possibly completed from a fallback language.
    pub bundle: Option<ContentBundle>,
    /// Language whose bundle (or primary data) backs the result.
    pub language_used: String,
    /// Whether a fallback language's bundle was used.
    pub used_fallback: bool,
}
