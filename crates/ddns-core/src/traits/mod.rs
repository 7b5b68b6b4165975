//! Core traits for the DDNS agent
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`AddressSource`]: Discover the host's current IP address
//! - [`DnsProvider`]: Look up and update DNS records via provider APIs

pub mod address_source;
pub mod dns_provider;

pub use address_source::AddressSource;
pub use dns_provider::{ApiVersion, DnsProvider, SubdomainRecord};
