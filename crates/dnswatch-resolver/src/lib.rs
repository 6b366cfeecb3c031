// # Name Resolvers
//
// This crate provides the `NameResolver` implementations for the DNS watcher.
//
// ## Resolvers
//
// - **system**: The operating system resolver (getaddrinfo via tokio). Honors
//   /etc/hosts and nsswitch, exactly like any other process on the host.
// - **hickory**: A stub resolver built from the system's resolv.conf. Talks
//   DNS directly, bypassing /etc/hosts.
//
// ## Responsibilities
//
// A resolver answers one lookup per call:
// - ✅ Returns addresses in resolver order (the engine uses the first)
// - ✅ Returns an empty list when the name has no address records
// - ❌ NO caching across calls (history is owned by the windowed set)
// - ❌ NO retry logic (the next tick is the retry)
// - ❌ NO background tasks

use async_trait::async_trait;
use dnswatch_core::config::ResolverConfig;
use dnswatch_core::traits::{NameResolver, ResolverFactory};
use dnswatch_core::{Error, Result};
use hickory_resolver::proto::ProtoErrorKind;
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::{ResolveErrorKind, Resolver};
use std::net::IpAddr;
use tracing::{debug, trace};

/// Resolver backed by the operating system
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

impl SystemResolver {
    /// Create a resolver that uses the host's name service
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NameResolver for SystemResolver {
    async fn resolve(&self, name: &str) -> Result<Vec<IpAddr>> {
        trace!("Resolving {} via system resolver", name);

        let addrs = tokio::net::lookup_host((name, 0))
            .await
            .map_err(|e| Error::resolve(name, e.to_string()))?;

        // getaddrinfo repeats an address once per socket type
        let mut out: Vec<IpAddr> = Vec::new();
        for addr in addrs {
            if !out.contains(&addr.ip()) {
                out.push(addr.ip());
            }
        }

        debug!("{} -> {:?}", name, out);
        Ok(out)
    }

    fn resolver_name(&self) -> &'static str {
        "system"
    }
}

/// Stub resolver speaking DNS to the configured name servers
pub struct HickoryResolver {
    resolver: Resolver<TokioConnectionProvider>,
}

impl HickoryResolver {
    /// Build a resolver from the system configuration
    pub fn from_system_conf() -> Result<Self> {
        let resolver = Resolver::builder_tokio()
            .map_err(|e| Error::config(format!("Cannot read resolver configuration: {}", e)))?
            .build();
        Ok(Self { resolver })
    }
}

#[async_trait]
impl NameResolver for HickoryResolver {
    async fn resolve(&self, name: &str) -> Result<Vec<IpAddr>> {
        trace!("Resolving {} via hickory", name);

        match self.resolver.lookup_ip(name).await {
            Ok(lookup) => {
                let addrs: Vec<IpAddr> = lookup.iter().collect();
                debug!("{} -> {:?}", name, addrs);
                Ok(addrs)
            }
            Err(e) => {
                if let ResolveErrorKind::Proto(proto_error) = e.kind()
                    && let ProtoErrorKind::NoRecordsFound { .. } = proto_error.kind()
                {
                    debug!("{} has no address records", name);
                    return Ok(Vec::new());
                }
                Err(Error::resolve(name, e.to_string()))
            }
        }
    }

    fn resolver_name(&self) -> &'static str {
        "hickory"
    }
}

/// Factory for the system resolver
pub struct SystemResolverFactory;

impl ResolverFactory for SystemResolverFactory {
    fn create(&self, config: &ResolverConfig) -> Result<Box<dyn NameResolver>> {
        match config {
            ResolverConfig::System => Ok(Box::new(SystemResolver::new())),
            _ => Err(Error::config("Invalid config for system resolver factory")),
        }
    }
}

/// Factory for the hickory stub resolver
pub struct HickoryResolverFactory;

impl ResolverFactory for HickoryResolverFactory {
    fn create(&self, config: &ResolverConfig) -> Result<Box<dyn NameResolver>> {
        match config {
            ResolverConfig::Hickory => Ok(Box::new(HickoryResolver::from_system_conf()?)),
            _ => Err(Error::config("Invalid config for hickory resolver factory")),
        }
    }
}

/// Register the resolvers with a registry
///
/// Call this function to make the "system" and "hickory" resolvers
/// available in the registry.
pub fn register(registry: &dnswatch_core::ComponentRegistry) {
    registry.register_resolver("system", Box::new(SystemResolverFactory));
    registry.register_resolver("hickory", Box::new(HickoryResolverFactory));
}

#[cfg(test)]
mod tests {
    use super::*;
    use dnswatch_core::ComponentRegistry;
    use tokio_test::assert_ok;

    #[test]
    fn test_register() {
        let registry = ComponentRegistry::new();
        register(&registry);

        assert!(registry.has_resolver("system"));
        assert!(registry.has_resolver("hickory"));
    }

    #[test]
    fn test_factory_rejects_foreign_config() {
        let result = SystemResolverFactory.create(&ResolverConfig::Hickory);
        assert!(matches!(result, Err(Error::Config(_))));

        let result = HickoryResolverFactory.create(&ResolverConfig::System);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_system_resolver_localhost() {
        let registry = ComponentRegistry::new();
        register(&registry);
        let resolver = assert_ok!(registry.create_resolver(&ResolverConfig::System));

        // "localhost" is answered from /etc/hosts without network access
        let addrs = assert_ok!(resolver.resolve("localhost").await);
        assert!(!addrs.is_empty());
        assert!(addrs.iter().all(|a| a.is_loopback()));
        assert_eq!(resolver.resolver_name(), "system");
    }

    #[tokio::test]
    async fn test_system_resolver_ip_literal() {
        let resolver = SystemResolver::new();
        let addrs = assert_ok!(resolver.resolve("127.0.0.1").await);
        assert_eq!(addrs, vec![IpAddr::from([127, 0, 0, 1])]);
    }
}
