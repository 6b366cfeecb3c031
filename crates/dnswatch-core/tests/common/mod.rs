//! Test doubles and common utilities for engine contract tests
//!
//! These doubles stand in for DNS and mail so the contract tests can drive
//! the engine deterministically under paused tokio time.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use dnswatch_core::config::{EngineConfig, RecipientConfig, TransportConfig, WatchConfig};
use dnswatch_core::error::{Error, Result};
use dnswatch_core::traits::{Clock, NameResolver, NotificationTransport, Recipient, RenderedMessage};
use dnswatch_core::{EngineEvent, TemplateRenderer, ProcessIdentity, WatchEngine};
use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Parse an address literal
pub fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

/// A resolver that plays back a per-name script, one step per call
///
/// `None` steps fail the lookup. The last step repeats forever.
pub struct ScriptedResolver {
    script: Mutex<HashMap<String, VecDeque<Option<IpAddr>>>>,
    calls: AtomicUsize,
}

impl ScriptedResolver {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Replace the script for `name`
    pub fn script(&self, name: &str, steps: &[Option<&str>]) {
        let steps = steps.iter().map(|s| s.map(ip)).collect();
        self.script.lock().unwrap().insert(name.to_string(), steps);
    }

    /// Number of resolve() calls across all names
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl NameResolver for ScriptedResolver {
    async fn resolve(&self, name: &str) -> Result<Vec<IpAddr>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut script = self.script.lock().unwrap();
        let steps = script
            .get_mut(name)
            .ok_or_else(|| Error::resolve(name, "no such host"))?;

        let step = if steps.len() > 1 {
            steps.pop_front().flatten()
        } else {
            steps.front().copied().flatten()
        };

        match step {
            Some(addr) => Ok(vec![addr]),
            None => Err(Error::resolve(name, "SERVFAIL")),
        }
    }

    fn resolver_name(&self) -> &'static str {
        "scripted"
    }
}

/// A transport that records every delivery
///
/// Recipients listed in `failing` are rejected. An optional delay makes each
/// send take that long (in tokio time).
pub struct RecordingTransport {
    failing: Vec<String>,
    delay: Option<std::time::Duration>,
    sent: Mutex<Vec<(String, RenderedMessage)>>,
    attempts: AtomicUsize,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            failing: Vec::new(),
            delay: None,
            sent: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn failing_for(mut self, address: &str) -> Self {
        self.failing.push(address.to_string());
        self
    }

    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Addresses that received a message, in delivery order
    pub fn delivered_to(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(to, _)| to.clone())
            .collect()
    }

    /// Messages that were delivered
    pub fn messages(&self) -> Vec<RenderedMessage> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, m)| m.clone())
            .collect()
    }

    /// Number of send() calls, successful or not
    pub fn attempt_count(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl NotificationTransport for RecordingTransport {
    async fn send(&self, recipient: &Recipient, message: &RenderedMessage) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.contains(&recipient.address) {
            return Err(Error::transport(&recipient.address, "550 mailbox unavailable"));
        }

        self.sent
            .lock()
            .unwrap()
            .push((recipient.address.clone(), message.clone()));
        Ok(())
    }

    fn transport_name(&self) -> &'static str {
        "recording"
    }
}

/// A clock that follows tokio's (possibly paused) time
pub struct TokioClock {
    base: DateTime<Utc>,
    started: tokio::time::Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            base: DateTime::parse_from_rfc3339("2024-03-01T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            started: tokio::time::Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        self.base + chrono::Duration::from_std(self.started.elapsed()).unwrap()
    }
}

/// Minimal valid config: one name, the given recipients, a mock transport,
/// 60s ticks and a 300s retention window
pub fn minimal_config(name: &str, recipients: &[&str]) -> WatchConfig {
    let mut config = WatchConfig::new().with_watched(name);
    for r in recipients {
        config = config.with_recipient(RecipientConfig::new(*r));
    }
    config.transport = TransportConfig::Custom {
        factory: "mock".to_string(),
        config: serde_json::json!({}),
    };
    config.engine = EngineConfig {
        tick_interval_secs: 60,
        retention_secs: 300,
        resolve_timeout_secs: 10,
        event_channel_capacity: 100,
        ..EngineConfig::default()
    };
    config
}

/// Build an engine over the given doubles
pub fn engine(
    resolver: Arc<ScriptedResolver>,
    transport: Arc<RecordingTransport>,
    config: WatchConfig,
) -> (WatchEngine, mpsc::Receiver<EngineEvent>) {
    let (engine, events) = WatchEngine::new(
        resolver,
        transport,
        Arc::new(TemplateRenderer::new()),
        Arc::new(TokioClock::new()),
        config,
    );
    let engine = engine.with_identity(ProcessIdentity {
        pid: 4242,
        hostname: "test-host".to_string(),
    });
    (engine, events)
}

/// Start an initialized engine on its own task
pub fn spawn(
    mut engine: WatchEngine,
) -> (oneshot::Sender<()>, JoinHandle<(WatchEngine, Result<()>)>) {
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle = tokio::spawn(async move {
        let result = engine.start(shutdown_rx).await;
        (engine, result)
    });
    (shutdown_tx, handle)
}

/// Collect every event already queued
pub fn drain(events: &mut mpsc::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

/// Only the ChangeDetected events, as (name, previous, new)
pub fn changes(events: &[EngineEvent]) -> Vec<(String, Option<IpAddr>, IpAddr)> {
    events
        .iter()
        .filter_map(|e| match e {
            EngineEvent::ChangeDetected { name, previous, new } => {
                Some((name.clone(), *previous, *new))
            }
            _ => None,
        })
        .collect()
}

/// Sleep until just past the `n`-th tick of an engine started now
pub async fn run_for_ticks(n: u64) {
    tokio::time::sleep(tokio::time::Duration::from_secs(60 * n + 1)).await;
}
