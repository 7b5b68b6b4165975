//! Contract Test: Domain and Subdomain Resolution
//!
//! Constraints verified:
//! - Malformed subdomain lists are rejected before any provider call
//! - An unknown domain is fatal
//! - Unknown subdomains are dropped, the rest are kept in configured order
//! - An empty target set is not an error

mod common;

use common::*;
use ddns_core::{DomainResolver, Error, ResolvedTarget};

#[tokio::test]
async fn forbidden_character_rejected_before_any_provider_call() {
    let provider = example_provider();

    let result = DomainResolver::new(&provider)
        .resolve("example.com", "home;nas")
        .await;

    assert!(matches!(result, Err(Error::InvalidInput(_))));
    assert!(
        provider.calls().is_empty(),
        "Expected no provider calls, got {:?}",
        provider.calls()
    );
}

#[tokio::test]
async fn unknown_domain_is_fatal() {
    let provider = example_provider();

    let err = DomainResolver::new(&provider)
        .resolve("unknown.org", "home")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NotFound(_)));
    assert!(err.is_fatal_config());
    assert_eq!(
        provider.calls(),
        vec![ProviderCall::LookupDomain("unknown.org".to_string())]
    );
}

#[tokio::test]
async fn domain_name_is_trimmed() {
    let provider = example_provider();

    let domain = DomainResolver::new(&provider)
        .resolve("  example.com \n", "home")
        .await
        .expect("resolution succeeds");

    assert_eq!(domain.name, "example.com");
    assert_eq!(domain.id, "1");
}

#[tokio::test]
async fn unknown_subdomain_dropped_known_kept() {
    let provider = example_provider();

    let domain = DomainResolver::new(&provider)
        .resolve("example.com", "home,nas")
        .await
        .expect("resolution succeeds");

    assert_eq!(
        domain.targets,
        vec![ResolvedTarget {
            domain_id: "1".to_string(),
            subdomain_id: "10".to_string(),
            label: "home".to_string(),
        }]
    );
}

#[tokio::test]
async fn targets_follow_configured_order_and_skip_blanks() {
    let provider = RecordingProvider::new()
        .with_domain("example.com", "1")
        .with_subdomain("1", "api", "30", "1.1.1.1")
        .with_subdomain("1", "www", "10", "1.1.1.1")
        .with_subdomain("1", "blog", "20", "1.1.1.1");

    let domain = DomainResolver::new(&provider)
        .resolve("example.com", "www, blog ,  ,api")
        .await
        .expect("resolution succeeds");

    let labels: Vec<_> = domain.targets.iter().map(|t| t.label.as_str()).collect();
    assert_eq!(labels, vec!["www", "blog", "api"]);

    // One domain lookup plus exactly three subdomain lookups
    let lookups = provider
        .calls()
        .into_iter()
        .filter(|c| matches!(c, ProviderCall::LookupSubdomain { .. }))
        .count();
    assert_eq!(lookups, 3);
}

#[tokio::test]
async fn failing_subdomain_lookup_is_soft() {
    let provider = example_provider()
        .with_subdomain("1", "nas", "11", "0.0.0.0")
        .with_broken_lookup("nas");

    let domain = DomainResolver::new(&provider)
        .resolve("example.com", "nas,home")
        .await
        .expect("resolution succeeds despite one failing lookup");

    let labels: Vec<_> = domain.targets.iter().map(|t| t.label.as_str()).collect();
    assert_eq!(labels, vec!["home"]);
}

#[tokio::test]
async fn empty_target_set_is_not_fatal() {
    let provider = example_provider();

    let domain = DomainResolver::new(&provider)
        .resolve("example.com", "nas")
        .await
        .expect("resolution succeeds");

    assert!(domain.targets.is_empty());
}
