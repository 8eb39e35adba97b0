//! Tests for builder configuration validation — programming errors fail
//! fast at build time, before any cache exists.

use std::sync::Arc;

use async_trait::async_trait;

use bragi::{Bragi, BragiError, ContentBundle, ContentSource, FallbackChains, Result};

struct NullSource;

#[async_trait]
impl ContentSource for NullSource {
    async fn fetch(&self, namespace: &str, language: &str) -> Result<ContentBundle> {
        Err(BragiError::fetch(namespace, language, "no data"))
    }
}

fn base() -> bragi::BragiBuilder {
    Bragi::builder()
        .source(Arc::new(NullSource))
        .fallback_chains(FallbackChains::new("en"))
        .no_persistence()
}

#[test]
fn valid_configuration_builds() {
    assert!(base().build().is_ok());
}

#[test]
fn missing_source_is_rejected() {
    let err = Bragi::builder()
        .fallback_chains(FallbackChains::new("en"))
        .no_persistence()
        .build()
        .unwrap_err();
    assert!(matches!(err, BragiError::Configuration(_)));
    assert!(err.is_fatal());
}

#[test]
fn missing_chains_are_rejected() {
    let err = Bragi::builder()
        .source(Arc::new(NullSource))
        .no_persistence()
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("no fallback chains"));
}

#[test]
fn self_referencing_chain_is_rejected() {
    let err = base()
        .fallback_chains(FallbackChains::new("en").chain("tr", ["tr"]))
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("references itself"));
}

#[test]
fn empty_default_language_is_rejected() {
    let err = base()
        .fallback_chains(FallbackChains::new(""))
        .build()
        .unwrap_err();
    assert!(matches!(err, BragiError::Configuration(_)));
}

#[test]
fn empty_required_fields_are_rejected() {
    let err = base().required_fields(Vec::<String>::new()).build().unwrap_err();
    assert!(err.to_string().contains("required-field set is empty"));
}

#[test]
fn empty_merge_fields_are_rejected() {
    let err = base().merge_fields(Vec::<String>::new()).build().unwrap_err();
    assert!(err.to_string().contains("merge-field set is empty"));
}

#[test]
fn zero_max_size_is_rejected() {
    let err = base().max_size(0).build().unwrap_err();
    assert!(matches!(err, BragiError::Configuration(_)));
}

#[test]
fn zero_max_age_is_rejected() {
    let err = base().max_age(std::time::Duration::ZERO).build().unwrap_err();
    assert!(matches!(err, BragiError::Configuration(_)));
}

#[test]
fn runtime_errors_are_not_fatal() {
    assert!(!BragiError::fetch("page", "en", "timeout").is_fatal());
    assert!(!BragiError::Snapshot("disk full".into()).is_fatal());
}
