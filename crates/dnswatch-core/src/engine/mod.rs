//! Core watch engine
//!
//! The WatchEngine is responsible for:
//! - Building one AddressWatcher per watched name
//! - Driving the CheckScheduler once per tick
//! - Dispatching every confirmed change through the ChangeNotifier
//! - Stopping cleanly on a shutdown signal
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   tick    ┌────────────────┐  resolve  ┌──────────────┐
//! │ tick_stream │──────────▶│ CheckScheduler │──────────▶│ NameResolver │
//! └─────────────┘           └────────────────┘           └──────────────┘
//!                                   │ ChangeEvent
//!                                   ▼
//!                           ┌────────────────┐   send    ┌───────────────────────┐
//!                           │ ChangeNotifier │──────────▶│ NotificationTransport │
//!                           └────────────────┘           └───────────────────────┘
//! ```
//!
//! ## Lifecycle
//!
//! ```text
//! Created ──init()──▶ Initialized ──start()──▶ Running ──shutdown──▶ Stopped
//! ```
//!
//! `clear()` may be called from any state.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};

use crate::config::WatchConfig;
use crate::error::{Error, Result};
use crate::notifier::{ChangeNotifier, ProcessIdentity};
use crate::scheduler::{CheckScheduler, TickReport, tick_stream};
use crate::traits::{Clock, MessageRenderer, NameResolver, NotificationTransport, Recipient};
use crate::watcher::{AddressWatcher, ChangeEvent};

/// Events emitted by the WatchEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Engine started
    Started {
        watched_count: usize,
    },

    /// Resolution of a watched name failed this tick
    CheckFailed {
        name: String,
        error: String,
    },

    /// A change was confirmed
    ChangeDetected {
        name: String,
        previous: Option<std::net::IpAddr>,
        new: std::net::IpAddr,
    },

    /// A change was delivered to at least one recipient
    NotificationSent {
        name: String,
        delivered: usize,
        failed: usize,
    },

    /// A change could not be delivered to anybody
    NotificationFailed {
        name: String,
        error: String,
    },

    /// Engine stopped
    Stopped {
        reason: String,
    },
}

/// Lifecycle state of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Constructed, `init()` not called yet
    Created,
    /// Watchers and recipients built
    Initialized,
    /// Scheduler loop running
    Running,
    /// Terminal
    Stopped,
}

/// Core watch engine
///
/// ## Threading
///
/// The engine runs all checks on the task calling [`WatchEngine::start`].
/// Watchers are owned by the scheduler and mutated only by their own check,
/// so no locking is involved.
pub struct WatchEngine {
    /// Static configuration, read once by `init()`
    config: WatchConfig,

    /// Resolver for watched names
    resolver: Arc<dyn NameResolver>,

    /// Transport for notifications
    transport: Arc<dyn NotificationTransport>,

    /// Message renderer
    renderer: Arc<dyn MessageRenderer>,

    /// Source of observation timestamps
    clock: Arc<dyn Clock>,

    /// Identity included in notifications
    identity: ProcessIdentity,

    /// Built by `init()`
    scheduler: Option<CheckScheduler>,

    /// Built by `init()`
    notifier: Option<ChangeNotifier>,

    state: EngineState,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl WatchEngine {
    /// Create a new engine
    ///
    /// Nothing is validated here; call [`WatchEngine::init`] before starting.
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        resolver: Arc<dyn NameResolver>,
        transport: Arc<dyn NotificationTransport>,
        renderer: Arc<dyn MessageRenderer>,
        clock: Arc<dyn Clock>,
        config: WatchConfig,
    ) -> (Self, mpsc::Receiver<EngineEvent>) {
        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity.max(1));

        let engine = Self {
            config,
            resolver,
            transport,
            renderer,
            clock,
            identity: ProcessIdentity::current(),
            scheduler: None,
            notifier: None,
            state: EngineState::Created,
            event_tx: tx,
        };

        (engine, rx)
    }

    /// Override the process identity reported in notifications
    pub fn with_identity(mut self, identity: ProcessIdentity) -> Self {
        self.identity = identity;
        self
    }

    /// Current lifecycle state
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// The watchers, once initialized
    pub fn watchers(&self) -> &[AddressWatcher] {
        self.scheduler
            .as_ref()
            .map(|s| s.watchers())
            .unwrap_or_default()
    }

    /// Validate the configuration and build watchers, recipients and notifier
    ///
    /// Must be called exactly once, before [`WatchEngine::start`].
    pub fn init(&mut self) -> Result<()> {
        if self.state != EngineState::Created {
            return Err(Error::lifecycle(format!(
                "init() called in state {:?}",
                self.state
            )));
        }

        self.config.validate()?;

        let retention = self.config.engine.retention();
        let watchers: Vec<AddressWatcher> = self
            .config
            .watched
            .iter()
            .filter(|w| {
                if !w.enabled {
                    debug!("Watched name {} is disabled, skipping", w.name);
                }
                w.enabled
            })
            .map(|w| AddressWatcher::new(w.name.trim(), retention))
            .collect();

        let recipients: Vec<Recipient> =
            self.config.recipients.iter().map(Recipient::from).collect();

        info!(
            "Initialized {} watcher(s), {} recipient(s), retention {}s, tick {}s",
            watchers.len(),
            recipients.len(),
            self.config.engine.retention_secs,
            self.config.engine.tick_interval_secs
        );

        self.scheduler = Some(CheckScheduler::new(
            watchers,
            self.resolver.clone(),
            self.clock.clone(),
            self.config.engine.resolve_timeout(),
        ));
        self.notifier = Some(ChangeNotifier::new(
            recipients,
            self.transport.clone(),
            self.renderer.clone(),
            self.config.engine.template_name.clone(),
            self.identity.clone(),
        ));
        self.state = EngineState::Initialized;

        Ok(())
    }

    /// Run until `shutdown` fires (or its sender is dropped)
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Clean shutdown
    /// - `Err(Error)`: The engine was not initialized; it never entered Running
    pub async fn start(&mut self, shutdown: oneshot::Receiver<()>) -> Result<()> {
        self.run_internal(Some(shutdown)).await
    }

    /// Run until Ctrl-C
    pub async fn run(&mut self) -> Result<()> {
        self.run_internal(None).await
    }

    /// Release watchers and notifier
    ///
    /// Safe in any state, including after a failed `init()`. The engine is
    /// terminal afterwards.
    pub fn clear(&mut self) {
        self.scheduler = None;
        self.notifier = None;
        self.state = EngineState::Stopped;
        debug!("Engine resources released");
    }

    async fn run_internal(&mut self, shutdown_rx: Option<oneshot::Receiver<()>>) -> Result<()> {
        if self.state != EngineState::Initialized {
            return Err(Error::lifecycle(format!(
                "start() called in state {:?}",
                self.state
            )));
        }

        let (mut scheduler, notifier) = match (self.scheduler.take(), self.notifier.take()) {
            (Some(scheduler), Some(notifier)) => (scheduler, notifier),
            _ => return Err(Error::lifecycle("engine resources missing")),
        };

        self.state = EngineState::Running;
        self.emit_event(EngineEvent::Started {
            watched_count: scheduler.watchers().len(),
        });
        info!(
            "Watching {} name(s) every {}s",
            scheduler.watchers().len(),
            self.config.engine.tick_interval_secs
        );

        let mut ticks = tick_stream(self.config.engine.tick_interval());

        // Main event loop
        let reason = if let Some(mut rx) = shutdown_rx {
            loop {
                tokio::select! {
                    biased;

                    _ = &mut rx => {
                        break "Shutdown signal";
                    }

                    Some(_) = ticks.next() => {
                        let report = scheduler.tick().await;
                        self.handle_tick(&notifier, report).await;
                    }
                }
            }
        } else {
            loop {
                tokio::select! {
                    biased;

                    _ = tokio::signal::ctrl_c() => {
                        break "Shutdown signal";
                    }

                    Some(_) = ticks.next() => {
                        let report = scheduler.tick().await;
                        self.handle_tick(&notifier, report).await;
                    }
                }
            }
        };

        info!("Shutdown signal received");
        self.emit_event(EngineEvent::Stopped {
            reason: reason.to_string(),
        });

        self.scheduler = Some(scheduler);
        self.notifier = Some(notifier);
        self.state = EngineState::Stopped;
        info!("Engine stopped");

        Ok(())
    }

    /// Report failures and dispatch every change of one tick
    async fn handle_tick(&self, notifier: &ChangeNotifier, report: TickReport) {
        debug!(
            "Tick checked {} name(s): {} change(s), {} failure(s)",
            report.checked,
            report.changes.len(),
            report.failures.len()
        );

        for (name, e) in report.failures {
            self.emit_event(EngineEvent::CheckFailed {
                name,
                error: e.to_string(),
            });
        }

        for change in report.changes {
            self.dispatch(notifier, change).await;
        }
    }

    async fn dispatch(&self, notifier: &ChangeNotifier, change: ChangeEvent) {
        self.emit_event(EngineEvent::ChangeDetected {
            name: change.name.clone(),
            previous: change.previous,
            new: change.new,
        });

        match notifier.notify(&change).await {
            Ok(report) => {
                self.emit_event(EngineEvent::NotificationSent {
                    name: change.name,
                    delivered: report.delivered.len(),
                    failed: report.failed.len(),
                });
            }
            Err(e) => {
                error!("Failed to notify change of {}: {}", change.name, e);
                self.emit_event(EngineEvent::NotificationFailed {
                    name: change.name,
                    error: e.to_string(),
                });
            }
        }
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        // Send event, logging warning if channel is full (backpressure)
        if self.event_tx.try_send(event).is_err() {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
    }
}
