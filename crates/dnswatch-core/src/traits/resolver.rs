// # Name Resolver Trait
//
// Defines the interface for resolving a watched name to its current addresses.
//
// ## Implementations
//
// - System resolver and hickory stub resolver: `dnswatch-resolver` crate
//
// ## Usage
//
// ```rust,ignore
// use dnswatch_core::NameResolver;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let resolver = /* NameResolver implementation */;
//
//     let addrs = resolver.resolve("example.com").await?;
//     println!("example.com -> {:?}", addrs.first());
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::IpAddr;

/// Trait for name resolver implementations
///
/// The engine uses the *first* returned address as the representative value
/// of a watched name. An empty list is treated exactly like a lookup error.
///
/// # Responsibilities
///
/// Resolvers answer one lookup per call. They must not:
/// - Cache answers across calls (the windowed set owns history)
/// - Retry on failure (the next tick is the retry)
/// - Spawn background tasks
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait NameResolver: Send + Sync {
    /// Resolve a name to its addresses
    ///
    /// # Parameters
    ///
    /// - `name`: The watched name (e.g., "example.com")
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<IpAddr>)`: Addresses in resolver order (may be empty)
    /// - `Err(Error)`: If the lookup failed
    async fn resolve(&self, name: &str) -> Result<Vec<IpAddr>, crate::Error>;

    /// Get the resolver name (for logging/debugging)
    fn resolver_name(&self) -> &'static str;
}

/// Helper trait for constructing resolvers from configuration
pub trait ResolverFactory: Send + Sync {
    /// Create a NameResolver instance from configuration
    fn create(
        &self,
        config: &crate::config::ResolverConfig,
    ) -> Result<Box<dyn NameResolver>, crate::Error>;
}
