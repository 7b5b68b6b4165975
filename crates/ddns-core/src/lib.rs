// # ddns-core
//
// Core library for the DDNS update agent.
//
// ## Architecture Overview
//
// This library provides the core functionality for dynamic DNS updates:
// - **AddressSource**: Trait for discovering the host's current IP address
// - **DnsProvider**: Trait for looking up and updating DNS records via provider APIs
// - **RetryPolicy**: Fixed-backoff retry around address discovery
// - **DomainResolver**: Validates the configured domain/subdomains against the provider
// - **UpdateLoop**: Discovery cycle with change detection and per-target updates
// - **Supervisor**: Bounded-restart crash recovery around the update loop
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from implementations
// 2. **Single Writer**: The last observed address is owned by the loop, not a global
// 3. **Library-First**: All core functionality can be used as a library
// 4. **Fail Fast on Misconfiguration**: Resolution errors never reach the loop
// 5. **Self-Healing, Bounded**: Unexpected failures restart the loop a fixed number of times

pub mod config;
pub mod engine;
pub mod error;
pub mod resolver;
pub mod retry;
pub mod traits;

// Re-export core types for convenience
pub use config::{DiscoveryMode, Settings};
pub use engine::{
    CycleOutcome, EngineEvent, LastObservedAddress, Supervisor, SupervisorExit, UpdateLoop,
};
pub use error::{Error, Result};
pub use resolver::{DomainResolver, ResolvedDomain, ResolvedTarget};
pub use retry::RetryPolicy;
pub use traits::{AddressSource, ApiVersion, DnsProvider, SubdomainRecord};
