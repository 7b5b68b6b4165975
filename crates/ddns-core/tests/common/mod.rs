//! Test doubles and common utilities for contract tests
//!
//! This module provides minimal test doubles that script address discovery
//! and record every provider call, without any network access.

#![allow(dead_code)]

use ddns_core::config::DiscoveryMode;
use ddns_core::error::{Error, Result};
use ddns_core::traits::{AddressSource, ApiVersion, DnsProvider, SubdomainRecord};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// One scripted discovery result
#[derive(Debug, Clone)]
pub enum Step {
    /// Return this address
    Address(&'static str),
    /// Fail with a fetch error
    Fail(&'static str),
    /// Panic inside discover()
    Panic(&'static str),
}

/// An AddressSource that plays back a script, repeating the last step forever
pub struct ScriptedAddressSource {
    steps: Vec<Step>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedAddressSource {
    pub fn new(steps: Vec<Step>) -> Self {
        assert!(!steps.is_empty(), "script needs at least one step");
        Self {
            steps,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Get the number of times discover() was called
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl AddressSource for ScriptedAddressSource {
    async fn discover(&self) -> Result<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self
            .steps
            .get(n)
            .or_else(|| self.steps.last())
            .cloned()
            .expect("non-empty script");

        match step {
            Step::Address(ip) => Ok(ip.to_string()),
            Step::Fail(msg) => Err(Error::fetch(msg)),
            Step::Panic(msg) => panic!("{}", msg),
        }
    }

    fn mode(&self) -> DiscoveryMode {
        DiscoveryMode::External
    }
}

/// A provider call, as recorded by [`RecordingProvider`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    LookupDomain(String),
    LookupSubdomain { domain_id: String, label: String },
    Update {
        domain_id: String,
        subdomain_id: String,
        label: String,
        ip: String,
    },
    ApiVersion,
}

/// A DnsProvider backed by in-memory tables that records every call
#[derive(Default)]
pub struct RecordingProvider {
    domains: HashMap<String, String>,
    subdomains: HashMap<(String, String), SubdomainRecord>,
    broken_lookups: HashSet<String>,
    failing_updates: HashSet<String>,
    calls: Mutex<Vec<ProviderCall>>,
}

impl RecordingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a domain known under the given ID
    pub fn with_domain(mut self, name: &str, id: &str) -> Self {
        self.domains.insert(name.to_string(), id.to_string());
        self
    }

    /// Make a subdomain of `domain_id` known
    pub fn with_subdomain(mut self, domain_id: &str, label: &str, id: &str, ip: &str) -> Self {
        self.subdomains.insert(
            (domain_id.to_string(), label.to_string()),
            SubdomainRecord {
                id: id.to_string(),
                current_ip: ip.to_string(),
            },
        );
        self
    }

    /// Make lookups of this label fail with a transport-style error
    pub fn with_broken_lookup(mut self, label: &str) -> Self {
        self.broken_lookups.insert(label.to_string());
        self
    }

    /// Make updates of this label fail
    pub fn with_failing_update(mut self, label: &str) -> Self {
        self.failing_updates.insert(label.to_string());
        self
    }

    /// All calls so far, in order
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().unwrap().clone()
    }

    /// `(label, ip)` of every update call so far, in order
    pub fn updates(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ProviderCall::Update { label, ip, .. } => Some((label, ip)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: ProviderCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl DnsProvider for RecordingProvider {
    async fn lookup_domain(&self, name: &str) -> Result<Option<String>> {
        self.record(ProviderCall::LookupDomain(name.to_string()));
        Ok(self.domains.get(name).cloned())
    }

    async fn lookup_subdomain(
        &self,
        domain_id: &str,
        label: &str,
    ) -> Result<Option<SubdomainRecord>> {
        self.record(ProviderCall::LookupSubdomain {
            domain_id: domain_id.to_string(),
            label: label.to_string(),
        });
        if self.broken_lookups.contains(label) {
            return Err(Error::http("connection reset"));
        }
        Ok(self
            .subdomains
            .get(&(domain_id.to_string(), label.to_string()))
            .cloned())
    }

    async fn update_record(
        &self,
        domain_id: &str,
        subdomain_id: &str,
        label: &str,
        new_ip: &str,
    ) -> Result<()> {
        self.record(ProviderCall::Update {
            domain_id: domain_id.to_string(),
            subdomain_id: subdomain_id.to_string(),
            label: label.to_string(),
            ip: new_ip.to_string(),
        });
        if self.failing_updates.contains(label) {
            return Err(Error::provider("recording", "record locked"));
        }
        Ok(())
    }

    async fn api_version(&self) -> Result<ApiVersion> {
        self.record(ProviderCall::ApiVersion);
        Ok(ApiVersion {
            version: "test".to_string(),
            released: None,
        })
    }

    fn provider_name(&self) -> &'static str {
        "recording"
    }
}

/// Provider knowing `example.com` (id 1) with `home` (id 10) but not `nas`
pub fn example_provider() -> RecordingProvider {
    RecordingProvider::new()
        .with_domain("example.com", "1")
        .with_subdomain("1", "home", "10", "0.0.0.0")
}
