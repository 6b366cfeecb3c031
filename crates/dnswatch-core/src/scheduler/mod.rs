//! Check scheduler
//!
//! The scheduler owns every [`AddressWatcher`] and performs one *tick*: it
//! resolves each watched name in configuration order and feeds the first
//! returned address into that name's watcher.
//!
//! Failures are per name. A lookup error, an empty answer or a timeout is
//! recorded in the [`TickReport`] and leaves that watcher untouched; the
//! remaining names are still checked in the same tick.
//!
//! The periodic timer itself lives in [`tick_stream`] and is driven by the
//! engine's select loop.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior, timeout};
use tokio_stream::wrappers::IntervalStream;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::traits::{Clock, NameResolver};
use crate::watcher::{AddressWatcher, ChangeEvent, Observation};

/// Outcome of one tick
#[derive(Debug, Default)]
pub struct TickReport {
    /// Changes confirmed during the tick, in watcher order
    pub changes: Vec<ChangeEvent>,
    /// Names whose resolution failed, with the error
    pub failures: Vec<(String, Error)>,
    /// Number of names checked
    pub checked: usize,
}

/// Resolves every watched name once per tick
pub struct CheckScheduler {
    watchers: Vec<AddressWatcher>,
    resolver: Arc<dyn NameResolver>,
    clock: Arc<dyn Clock>,
    resolve_timeout: Duration,
}

impl CheckScheduler {
    /// Create a scheduler over `watchers`
    pub fn new(
        watchers: Vec<AddressWatcher>,
        resolver: Arc<dyn NameResolver>,
        clock: Arc<dyn Clock>,
        resolve_timeout: Duration,
    ) -> Self {
        Self {
            watchers,
            resolver,
            clock,
            resolve_timeout,
        }
    }

    /// The watchers, in check order
    pub fn watchers(&self) -> &[AddressWatcher] {
        &self.watchers
    }

    /// Check every watched name once
    pub async fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();

        for watcher in &mut self.watchers {
            report.checked += 1;

            let address = match resolve_first(
                self.resolver.as_ref(),
                watcher.name(),
                self.resolve_timeout,
            )
            .await
            {
                Ok(address) => address,
                Err(e) => {
                    warn!("Check of {} failed: {}", watcher.name(), e);
                    report.failures.push((watcher.name().to_string(), e));
                    continue;
                }
            };

            let now = self.clock.now();
            debug!("{} resolved to {}", watcher.name(), address);

            if let Observation::Changed(event) = watcher.observe(address, now) {
                report.changes.push(event);
            }
        }

        report
    }
}

/// Resolve `name` and pick the representative (first) address
async fn resolve_first(
    resolver: &dyn NameResolver,
    name: &str,
    resolve_timeout: Duration,
) -> Result<IpAddr> {
    let addrs = timeout(resolve_timeout, resolver.resolve(name))
        .await
        .map_err(|_| Error::ResolveTimeout {
            name: name.to_string(),
            timeout_secs: resolve_timeout.as_secs(),
        })??;

    addrs
        .first()
        .copied()
        .ok_or_else(|| Error::empty_resolution(name))
}

/// Periodic tick source
///
/// The first tick fires one `period` after the call. If a tick is consumed
/// late, missed ticks are skipped rather than fired in a burst, so ticks stay
/// on the original schedule and never pile up.
pub fn tick_stream(period: Duration) -> IntervalStream {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    IntervalStream::new(interval)
}
