// # dnswatch-core
//
// Core library for the DNS change watcher.
//
// ## Architecture Overview
//
// This library watches a set of DNS names and notifies recipients when the
// address a name resolves to genuinely changes:
// - **WindowedSet**: Time-windowed set of recently observed values
// - **AddressWatcher**: Per-name change detection over a WindowedSet
// - **CheckScheduler**: Resolves every watched name once per tick
// - **ChangeNotifier**: Renders a change and dispatches it to every recipient
// - **WatchEngine**: Lifecycle (init, start, clear) and the tick loop
// - **ComponentRegistry**: Plugin-based registry for resolvers and transports
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from resolver and transport implementations
// 2. **Flap suppression**: An address seen within the retention window is never a change
// 3. **Plugin-Based**: Components are registered dynamically, no hard-coded if-else
// 4. **Library-First**: All core functionality can be used as a library
// 5. **Deterministic time**: Observation timestamps come from an injectable Clock

pub mod traits;
pub mod window;
pub mod watcher;
pub mod scheduler;
pub mod notifier;
pub mod engine;
pub mod registry;
pub mod config;
pub mod error;

// Re-export core types for convenience
pub use traits::{Clock, MessageRenderer, NameResolver, NotificationTransport, Recipient};
pub use window::WindowedSet;
pub use watcher::{AddressWatcher, ChangeEvent, Observation};
pub use scheduler::{CheckScheduler, TickReport};
pub use notifier::{ChangeNotifier, DispatchReport, ProcessIdentity, TemplateRenderer};
pub use engine::{EngineEvent, EngineState, WatchEngine};
pub use registry::ComponentRegistry;
pub use config::{
    EngineConfig, RecipientConfig, ResolverConfig, TransportConfig, WatchConfig,
    WatchedNameConfig,
};
pub use error::{Error, Result};
