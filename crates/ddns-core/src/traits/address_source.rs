// # Address Source Trait
//
// Defines the interface for discovering the host's current IP address.
//
// ## Implementations
//
// - Interface enumeration (internal mode): `ddns-ip-iface` crate
// - External "what is my IP" endpoint (external mode): `ddns-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::{AddressSource, RetryPolicy};
//
// let source = /* AddressSource implementation */;
//
// // Single attempt
// let address = source.discover().await?;
//
// // Retry with the default policy (unbounded, 1s backoff)
// let address = RetryPolicy::default().run("discover", || source.discover()).await?;
// ```

use async_trait::async_trait;

use crate::config::DiscoveryMode;

/// Trait for address discovery strategies
///
/// A source performs exactly one lookup per call. It does not retry, sleep
/// or cache; the retry policy and the last-observed address belong to the
/// caller.
///
/// # Errors
///
/// Implementations report:
/// - `Error::NoNetwork` when the host has no usable interface address
/// - `Error::Fetch` on any transport failure or non-success response
#[async_trait]
pub trait AddressSource: Send + Sync {
    /// Discover the current address
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: The address as text (e.g. "1.2.3.4")
    /// - `Err(Error)`: If this attempt failed
    async fn discover(&self) -> Result<String, crate::Error>;

    /// Which discovery strategy this source implements
    fn mode(&self) -> DiscoveryMode;
}

#[async_trait]
impl<T: AddressSource + ?Sized> AddressSource for std::sync::Arc<T> {
    async fn discover(&self) -> Result<String, crate::Error> {
        (**self).discover().await
    }

    fn mode(&self) -> DiscoveryMode {
        (**self).mode()
    }
}

#[async_trait]
impl<T: AddressSource + ?Sized> AddressSource for Box<T> {
    async fn discover(&self) -> Result<String, crate::Error> {
        (**self).discover().await
    }

    fn mode(&self) -> DiscoveryMode {
        (**self).mode()
    }
}
