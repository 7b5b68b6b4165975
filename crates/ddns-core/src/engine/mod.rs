//! Core update loop
//!
//! The UpdateLoop is responsible for:
//! - Discovering the current address via AddressSource (with retry)
//! - Comparing it against the last observed address
//! - Updating every resolved subdomain via DnsProvider when it changed
//! - Sleeping for the check interval between cycles
//!
//! The [`Supervisor`] runs the loop and relaunches it after unexpected
//! failures, up to a fixed restart ceiling.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐
//! │ AddressSource │─── address ───┐
//! └───────────────┘               │
//!                                 ▼
//!                         ┌──────────────┐      ┌────────────┐
//!                         │  UpdateLoop  │◀─────│ Supervisor │
//!                         └──────────────┘      └────────────┘
//!                                 │
//!                ┌────────────────┼────────────────┐
//!                │                │                │
//!                ▼                ▼                ▼
//!        ┌──────────────┐ ┌──────────────┐ ┌─────────────┐
//!        │ LastObserved │ │ DnsProvider  │ │   Events    │
//!        │ (compare)    │ │ (update)     │ │  (notify)   │
//!        └──────────────┘ └──────────────┘ └─────────────┘
//! ```
//!
//! ## Cycle
//!
//! 1. Discover address (blocks until success under the default policy)
//! 2. If equal to the last observed address, log and skip
//! 3. Otherwise record it and update each target in order; per-target
//!    failures are logged and do not stop the remaining targets
//! 4. Sleep for the check interval

pub mod supervisor;

pub use supervisor::{DEFAULT_RESTART_CEILING, Supervisor, SupervisorExit};

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::resolver::ResolvedDomain;
use crate::retry::RetryPolicy;
use crate::traits::{AddressSource, DnsProvider};

/// Events emitted by the UpdateLoop and Supervisor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A discovery cycle started
    CycleStarted,

    /// Discovered address equals the last observed one; nothing pushed
    AddressUnchanged { address: String },

    /// Discovered address differs from the last observed one
    AddressChanged {
        previous: Option<String>,
        address: String,
    },

    /// A target was pointed at the new address
    TargetUpdated { fqdn: String, address: String },

    /// Updating a target failed
    TargetFailed { fqdn: String, error: String },

    /// The loop instance died unexpectedly
    LoopFailed { reason: String, restart_count: usize },

    /// A fresh loop instance was launched
    LoopRestarted { restart_count: usize },

    /// Restart budget spent; no further loop instances
    RestartCeilingReached { restart_count: usize },

    /// Supervisor stopped on request
    Stopped { reason: String },
}

/// Outcome of a single discovery cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Address unchanged, no update calls made
    Unchanged,
    /// Address changed; per-target results
    Updated { succeeded: usize, failed: usize },
}

/// Optional, non-blocking event channel
///
/// When the channel is full events are dropped with a warning, so a slow
/// consumer never stalls the loop.
#[derive(Debug, Clone, Default)]
pub(crate) struct EventSink {
    tx: Option<mpsc::Sender<EngineEvent>>,
}

impl EventSink {
    fn channel(capacity: usize) -> (Self, mpsc::Receiver<EngineEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx: Some(tx) }, rx)
    }

    pub(crate) fn emit(&self, event: EngineEvent) {
        if let Some(tx) = &self.tx
            && tx.try_send(event).is_err()
        {
            warn!("Event channel full or closed, dropping event");
        }
    }
}

/// The most recent address that was pushed (or found unnecessary to push)
///
/// Shared between loop instances so that a relaunch after a crash does not
/// re-push an address that was already handled. Only the running loop
/// instance writes it.
#[derive(Debug, Clone, Default)]
pub struct LastObservedAddress {
    inner: Arc<RwLock<Option<String>>>,
}

impl LastObservedAddress {
    /// Create an unset value
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value, `None` if no cycle has completed discovery yet
    pub async fn get(&self) -> Option<String> {
        self.inner.read().await.clone()
    }

    async fn replace(&self, address: String) -> Option<String> {
        self.inner.write().await.replace(address)
    }
}

/// Core update loop
///
/// Cloning an `UpdateLoop` yields a new instance that shares the resolved
/// targets and the last observed address; the [`Supervisor`] relies on this
/// to relaunch a crashed loop without losing state.
#[derive(Clone)]
pub struct UpdateLoop {
    /// Address discovery strategy
    source: Arc<dyn AddressSource>,

    /// DNS provider for updating records
    provider: Arc<dyn DnsProvider>,

    /// Domain and targets, fixed at startup
    domain: Arc<ResolvedDomain>,

    /// Retry policy wrapped around discovery
    retry: RetryPolicy,

    /// Sleep between cycles
    check_interval: Duration,

    /// Last observed address
    last_observed: LastObservedAddress,

    /// Event sender for external monitoring
    events: EventSink,
}

impl UpdateLoop {
    /// Create a new update loop
    ///
    /// # Parameters
    ///
    /// - `source`: Address discovery strategy
    /// - `provider`: DNS provider implementation
    /// - `domain`: Output of [`crate::DomainResolver::resolve`]
    /// - `check_interval`: Sleep between cycles (see [`crate::Settings::check_interval`])
    pub fn new(
        source: Arc<dyn AddressSource>,
        provider: Arc<dyn DnsProvider>,
        domain: ResolvedDomain,
        check_interval: Duration,
    ) -> Self {
        Self {
            source,
            provider,
            domain: Arc::new(domain),
            retry: RetryPolicy::default(),
            check_interval,
            last_observed: LastObservedAddress::new(),
            events: EventSink::default(),
        }
    }

    /// Replace the discovery retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Attach an event channel of the given capacity
    ///
    /// # Returns
    ///
    /// A tuple of (loop, event_receiver) where event_receiver yields engine events
    pub fn with_events(mut self, capacity: usize) -> (Self, mpsc::Receiver<EngineEvent>) {
        let (sink, rx) = EventSink::channel(capacity);
        self.events = sink;
        (self, rx)
    }

    /// The last observed address handle
    pub fn last_observed(&self) -> &LastObservedAddress {
        &self.last_observed
    }

    /// The resolved domain this loop updates
    pub fn domain(&self) -> &ResolvedDomain {
        &self.domain
    }

    /// Sleep between cycles
    pub fn check_interval(&self) -> Duration {
        self.check_interval
    }

    pub(crate) fn events(&self) -> &EventSink {
        &self.events
    }

    /// Run cycles forever
    ///
    /// Only returns if a cycle fails, which requires a bounded retry policy.
    pub async fn run(&self) -> Result<()> {
        info!(
            "Update loop started: {} target(s), checking every {:?}",
            self.domain.targets.len(),
            self.check_interval
        );

        loop {
            self.run_cycle().await?;
            tokio::time::sleep(self.check_interval).await;
        }
    }

    /// Run a single discovery cycle (without the trailing sleep)
    pub async fn run_cycle(&self) -> Result<CycleOutcome> {
        self.events.emit(EngineEvent::CycleStarted);

        let source = &self.source;
        let address = self
            .retry
            .run("Fetch IP", || source.discover())
            .await?;

        if self.last_observed.get().await.as_deref() == Some(address.as_str()) {
            info!("IP not changed: {}", address);
            self.events.emit(EngineEvent::AddressUnchanged { address });
            return Ok(CycleOutcome::Unchanged);
        }

        let previous = self.last_observed.replace(address.clone()).await;
        info!("Current IP is {} (previous: {:?})", address, previous);
        self.events.emit(EngineEvent::AddressChanged {
            previous,
            address: address.clone(),
        });

        let mut succeeded = 0;
        let mut failed = 0;
        for target in &self.domain.targets {
            let fqdn = self.domain.fqdn(target);
            debug!("Updating {} -> {}", fqdn, address);

            match self
                .provider
                .update_record(&target.domain_id, &target.subdomain_id, &target.label, &address)
                .await
            {
                Ok(()) => {
                    info!("Subdomain {} updated to {}", fqdn, address);
                    succeeded += 1;
                    self.events.emit(EngineEvent::TargetUpdated {
                        fqdn,
                        address: address.clone(),
                    });
                }
                Err(e) => {
                    // Continue with other targets
                    error!("Subdomain {} update failed: {}", fqdn, e);
                    failed += 1;
                    self.events.emit(EngineEvent::TargetFailed {
                        fqdn,
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(CycleOutcome::Updated { succeeded, failed })
    }
}
