//! Plugin-based component registry
//!
//! The registry lets resolver and transport implementations register
//! themselves at startup, so the daemon can build components from
//! configuration without hardcoded if-else chains.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dnswatch_core::registry::ComponentRegistry;
//!
//! let registry = ComponentRegistry::new();
//!
//! // Implementation crates expose a `register()` function
//! dnswatch_resolver::register(&registry);
//! dnswatch_notify_smtp::register(&registry);
//!
//! let resolver = registry.create_resolver(&config.resolver)?;
//! let transport = registry.create_transport(&config.transport)?;
//! ```

use crate::config::{ResolverConfig, TransportConfig};
use crate::error::{Error, Result};
use crate::traits::{NameResolver, NotificationTransport, ResolverFactory, TransportFactory};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Registry of resolver and transport factories
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct ComponentRegistry {
    /// Registered resolver factories
    resolvers: RwLock<HashMap<String, Box<dyn ResolverFactory>>>,

    /// Registered transport factories
    transports: RwLock<HashMap<String, Box<dyn TransportFactory>>>,
}

impl ComponentRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resolver factory
    ///
    /// # Parameters
    ///
    /// - `name`: Resolver type name (e.g., "system", "hickory")
    /// - `factory`: Factory object for creating resolver instances
    pub fn register_resolver(&self, name: impl Into<String>, factory: Box<dyn ResolverFactory>) {
        write(&self.resolvers).insert(name.into(), factory);
    }

    /// Register a transport factory
    ///
    /// # Parameters
    ///
    /// - `name`: Transport type name (e.g., "smtp")
    /// - `factory`: Factory object for creating transport instances
    pub fn register_transport(
        &self,
        name: impl Into<String>,
        factory: Box<dyn TransportFactory>,
    ) {
        write(&self.transports).insert(name.into(), factory);
    }

    /// Create a resolver from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn NameResolver>)`: Created resolver instance
    /// - `Err(Error)`: If the resolver type is not registered or creation fails
    pub fn create_resolver(&self, config: &ResolverConfig) -> Result<Box<dyn NameResolver>> {
        let resolver_type = config.type_name();
        let resolvers = read(&self.resolvers);

        let factory = resolvers
            .get(resolver_type)
            .ok_or_else(|| Error::config(format!("Unknown resolver type: {}", resolver_type)))?;

        factory.create(config)
    }

    /// Create a transport from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn NotificationTransport>)`: Created transport instance
    /// - `Err(Error)`: If the transport type is not registered or creation fails
    pub fn create_transport(
        &self,
        config: &TransportConfig,
    ) -> Result<Box<dyn NotificationTransport>> {
        let transport_type = config.type_name();
        let transports = read(&self.transports);

        let factory = transports
            .get(transport_type)
            .ok_or_else(|| Error::config(format!("Unknown transport type: {}", transport_type)))?;

        factory.create(config)
    }

    /// List all registered resolver types
    pub fn list_resolvers(&self) -> Vec<String> {
        read(&self.resolvers).keys().cloned().collect()
    }

    /// List all registered transport types
    pub fn list_transports(&self) -> Vec<String> {
        read(&self.transports).keys().cloned().collect()
    }

    /// Check if a resolver type is registered
    pub fn has_resolver(&self, name: &str) -> bool {
        read(&self.resolvers).contains_key(name)
    }

    /// Check if a transport type is registered
    pub fn has_transport(&self, name: &str) -> bool {
        read(&self.transports).contains_key(name)
    }
}

// Factories are plain inserts/lookups, so a poisoned lock still holds a
// consistent map.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}
