//! Completeness predicate and field-level bundle merging.
//!
//! Both functions are pure: no cache access, no I/O, deterministic given
//! their inputs. The resolver decides *which* languages to combine; this
//! module decides *how* their fields combine.

use crate::types::{is_empty_value, ContentBundle, MergedBundle};

/// Whether a bundle counts as "missing" for fallback purposes.
///
/// Missing means none of the required fields is present as a non-empty
/// value. A bundle with even one required field populated is partial, not
/// missing — it is served as-is and completed field-by-field only when a
/// fallback round actually runs.
pub fn is_missing(bundle: &ContentBundle, required_fields: &[String]) -> bool {
    !required_fields
        .iter()
        .any(|field| bundle.get(field).is_some_and(|v| !is_empty_value(v)))
}

/// Field-level merge of a primary bundle with a fallback bundle.
///
/// For each field in `merge_fields`: the primary's value wins when present
/// and non-empty; otherwise the fallback's value is substituted (when it
/// has a non-empty one). Fields outside `merge_fields` come from the
/// primary verbatim — the fallback never overwrites fields it wasn't asked
/// to cover.
///
/// `used_fallback_language` on the result is `Some(fallback_language)` only
/// when at least one field was actually taken from the fallback.
///
/// Both inputs absent → `None`. One absent → the other unchanged.
pub fn merge(
    primary: Option<ContentBundle>,
    fallback: Option<ContentBundle>,
    fallback_language: &str,
    merge_fields: &[String],
) -> Option<MergedBundle> {
    match (primary, fallback) {
        (None, None) => None,
        (Some(fields), None) => Some(MergedBundle {
            fields,
            used_fallback_language: None,
        }),
        (None, Some(fields)) => Some(MergedBundle {
            fields,
            used_fallback_language: Some(fallback_language.to_string()),
        }),
        (Some(mut fields), Some(fallback)) => {
            let mut substituted = false;
            for name in merge_fields {
                let primary_empty = fields.get(name).map(is_empty_value).unwrap_or(true);
                if primary_empty
                    && let Some(value) = fallback.get(name)
                    && !is_empty_value(value)
                {
                    fields.insert(name.clone(), value.clone());
                    substituted = true;
                }
            }
            Some(MergedBundle {
                fields,
                used_fallback_language: substituted.then(|| fallback_language.to_string()),
            })
        }
    }
}
