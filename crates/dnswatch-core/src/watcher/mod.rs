//! Address watcher and change detection
//!
//! An [`AddressWatcher`] owns everything known about one watched name: its
//! windowed set of recently resolved addresses and the time of the last
//! confirmed change. It is mutated only by its own check, so watchers never
//! share mutable state.
//!
//! ## Transition per observation
//!
//! 1. Nothing observed yet: record the address as a baseline, no event.
//! 2. Address still inside the retention window: re-confirmation, no event.
//! 3. Address absent from the window: change. `previous` is the newest
//!    retained address before the insert (or `None` if the window had
//!    emptied), and one [`ChangeEvent`] is returned.

use chrono::{DateTime, Utc};
use std::net::IpAddr;
use tracing::{debug, info};

use crate::window::WindowedSet;

/// A confirmed change of a watched name's resolved address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// The watched name
    pub name: String,
    /// Newest address retained before the change, if any
    pub previous: Option<IpAddr>,
    /// The address that triggered the change
    pub new: IpAddr,
    /// Time since the previous change (or since the baseline observation)
    pub since_last_change: chrono::Duration,
    /// When the change was detected
    pub detected_at: DateTime<Utc>,
}

/// Outcome of feeding one resolved address into a watcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// First observation ever for this name
    Baseline,
    /// The address was already in the retention window
    Reconfirmed,
    /// The address was absent from the retention window
    Changed(ChangeEvent),
}

impl Observation {
    /// The change event, if this observation was a change
    pub fn into_change(self) -> Option<ChangeEvent> {
        match self {
            Observation::Changed(event) => Some(event),
            _ => None,
        }
    }
}

/// Per-name change detector
#[derive(Debug, Clone)]
pub struct AddressWatcher {
    name: String,
    window: WindowedSet<IpAddr>,
    last_change: Option<DateTime<Utc>>,
}

impl AddressWatcher {
    /// Create a watcher for `name` with the given retention window
    pub fn new(name: impl Into<String>, retention: chrono::Duration) -> Self {
        Self {
            name: name.into(),
            window: WindowedSet::new(retention),
            last_change: None,
        }
    }

    /// The watched name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The retention window of recently observed addresses
    pub fn window(&self) -> &WindowedSet<IpAddr> {
        &self.window
    }

    /// Time of the last confirmed change
    ///
    /// Set to the baseline observation time until the first real change.
    pub fn last_change(&self) -> Option<DateTime<Utc>> {
        self.last_change
    }

    /// Feed a freshly resolved address observed at `now`
    ///
    /// The whole step (prune, membership check, insert) runs under one
    /// `&mut self` borrow, so it is atomic with respect to this watcher.
    pub fn observe(&mut self, address: IpAddr, now: DateTime<Utc>) -> Observation {
        let Some(last_change) = self.last_change else {
            self.window.insert(address, now);
            self.last_change = Some(now);
            info!("{}: baseline address {}", self.name, address);
            return Observation::Baseline;
        };

        self.window.prune(now);

        if self.window.contains(&address) {
            self.window.insert(address, now);
            debug!("{}: {} reconfirmed, window {}", self.name, address, self.window);
            return Observation::Reconfirmed;
        }

        let previous = self.window.most_recent().copied();
        self.window.insert(address, now);
        self.last_change = Some(now);

        info!(
            "{}: address changed {} -> {}",
            self.name,
            previous.map(|ip| ip.to_string()).unwrap_or("none".to_string()),
            address
        );

        Observation::Changed(ChangeEvent {
            name: self.name.clone(),
            previous,
            new: address,
            since_last_change: now - last_change,
            detected_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn watcher() -> AddressWatcher {
        AddressWatcher::new("example.com", Duration::minutes(5))
    }

    #[test]
    fn test_first_observation_is_baseline() {
        let mut w = watcher();
        assert_eq!(w.observe(ip("10.0.0.1"), t0()), Observation::Baseline);
        assert_eq!(w.last_change(), Some(t0()));
        assert!(w.window().contains(&ip("10.0.0.1")));
    }

    #[test]
    fn test_reconfirmation_never_changes() {
        let mut w = watcher();
        w.observe(ip("10.0.0.1"), t0());

        for minute in 1..=20 {
            let obs = w.observe(ip("10.0.0.1"), t0() + Duration::minutes(minute));
            assert_eq!(obs, Observation::Reconfirmed, "minute {}", minute);
        }
        assert_eq!(w.last_change(), Some(t0()));
    }

    #[test]
    fn test_retention_scenario_a_a_b() {
        let mut w = watcher();
        assert_eq!(w.observe(ip("10.0.0.1"), t0()), Observation::Baseline);
        assert_eq!(
            w.observe(ip("10.0.0.1"), t0() + Duration::minutes(1)),
            Observation::Reconfirmed
        );

        let event = w
            .observe(ip("10.0.0.2"), t0() + Duration::minutes(2))
            .into_change()
            .expect("B is a change");

        assert_eq!(event.name, "example.com");
        assert_eq!(event.previous, Some(ip("10.0.0.1")));
        assert_eq!(event.new, ip("10.0.0.2"));
        assert_eq!(event.since_last_change, Duration::minutes(2));
        assert_eq!(event.detected_at, t0() + Duration::minutes(2));

        assert!(w.window().contains(&ip("10.0.0.1")));
        assert!(w.window().contains(&ip("10.0.0.2")));
    }

    #[test]
    fn test_flapping_inside_window_is_absorbed() {
        let mut w = watcher();
        w.observe(ip("10.0.0.1"), t0());
        assert!(matches!(
            w.observe(ip("10.0.0.2"), t0() + Duration::minutes(1)),
            Observation::Changed(_)
        ));

        // round-robin answers alternate between two known addresses
        for minute in 2..10 {
            let addr = if minute % 2 == 0 { "10.0.0.1" } else { "10.0.0.2" };
            assert_eq!(
                w.observe(ip(addr), t0() + Duration::minutes(minute)),
                Observation::Reconfirmed
            );
        }
    }

    #[test]
    fn test_previous_is_most_recent_before_insert() {
        let mut w = watcher();
        w.observe(ip("10.0.0.1"), t0());
        w.observe(ip("10.0.0.2"), t0() + Duration::minutes(1));
        w.observe(ip("10.0.0.1"), t0() + Duration::minutes(2));

        let event = w
            .observe(ip("10.0.0.3"), t0() + Duration::minutes(3))
            .into_change()
            .unwrap();
        assert_eq!(event.previous, Some(ip("10.0.0.1")));
        assert_eq!(event.since_last_change, Duration::minutes(2));
    }

    #[test]
    fn test_expired_window_makes_same_address_a_change_without_previous() {
        let mut w = watcher();
        w.observe(ip("10.0.0.1"), t0());

        // nothing observed for longer than the retention (e.g. an outage)
        let event = w
            .observe(ip("10.0.0.1"), t0() + Duration::minutes(6))
            .into_change()
            .expect("emptied window turns the next observation into a change");

        assert_eq!(event.previous, None);
        assert_eq!(event.new, ip("10.0.0.1"));
        assert_eq!(event.since_last_change, Duration::minutes(6));

        // and the window is live again afterwards
        assert_eq!(
            w.observe(ip("10.0.0.1"), t0() + Duration::minutes(7)),
            Observation::Reconfirmed
        );
    }

    #[test]
    fn test_partially_expired_window_keeps_previous() {
        let mut w = watcher();
        w.observe(ip("10.0.0.1"), t0());
        w.observe(ip("10.0.0.2"), t0() + Duration::minutes(4));

        // 10.0.0.1 has aged out, 10.0.0.2 has not
        let event = w
            .observe(ip("10.0.0.1"), t0() + Duration::minutes(6))
            .into_change()
            .unwrap();
        assert_eq!(event.previous, Some(ip("10.0.0.2")));
    }
}
