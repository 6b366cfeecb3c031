//! Core traits for the DNS watcher
//!
//! This module defines the abstract interfaces of the engine's collaborators.
//!
//! - [`NameResolver`]: Resolve a watched name to addresses
//! - [`Clock`]: Source of observation timestamps
//! - [`NotificationTransport`]: Deliver a rendered message to one recipient
//! - [`MessageRenderer`]: Turn change fields into a message

pub mod clock;
pub mod renderer;
pub mod resolver;
pub mod transport;

pub use clock::{Clock, ManualClock, SystemClock};
pub use renderer::{MessageFields, MessageRenderer, RenderedMessage};
pub use resolver::{NameResolver, ResolverFactory};
pub use transport::{NotificationTransport, Recipient, TransportFactory};
