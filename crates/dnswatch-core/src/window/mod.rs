// # Windowed Membership Set
//
// Records recently observed values of one watched name with their
// observation time, and forgets them once they fall out of the retention
// window.
//
// ## Eviction
//
// Eviction happens on mutation only (`insert` and `prune`), never on read.
// It is a single contiguous prefix cut: the entries are scanned from the
// newest toward the oldest, and the first entry whose age exceeds the
// retention marks the cut. That entry and everything before it is dropped.
//
// With monotonic timestamps this is the same as dropping every stale entry.
// With non-monotonic timestamps it is not: a fresh entry sitting before a
// stale one is dropped together with it.
//
// ```text
//   oldest                                   newest
//   [ a@t0 | b@t1 | c@t2 | d@t3 | e@t4 ]
//                   ^ first stale entry from the right
//   => [ d@t3 | e@t4 ]
// ```

use chrono::{DateTime, Utc};
use std::fmt;

/// A value paired with the time it was observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedValue<T> {
    /// The observed value
    pub value: T,
    /// When it was observed
    pub observed_at: DateTime<Utc>,
}

/// Time-windowed membership set
///
/// Entries are kept in insertion order. Duplicates are allowed; each one is a
/// separate confirmation of the same value.
#[derive(Debug, Clone)]
pub struct WindowedSet<T> {
    retention: chrono::Duration,
    entries: Vec<ObservedValue<T>>,
}

impl<T: PartialEq> WindowedSet<T> {
    /// Create an empty set with the given retention
    pub fn new(retention: chrono::Duration) -> Self {
        Self {
            retention,
            entries: Vec::new(),
        }
    }

    /// Record `value` as observed at `now`, then evict expired entries
    pub fn insert(&mut self, value: T, now: DateTime<Utc>) {
        self.entries.push(ObservedValue {
            value,
            observed_at: now,
        });
        self.prune(now);
    }

    /// Evict entries that expired as of `now` without recording anything
    pub fn prune(&mut self, now: DateTime<Utc>) {
        let cut = self
            .entries
            .iter()
            .rposition(|entry| now - entry.observed_at > self.retention);

        if let Some(index) = cut {
            self.entries.drain(..=index);
        }
    }

    /// Whether `value` equals any retained entry
    pub fn contains(&self, value: &T) -> bool {
        self.entries.iter().any(|entry| entry.value == *value)
    }

    /// The newest retained value
    pub fn most_recent(&self) -> Option<&T> {
        self.entries.last().map(|entry| &entry.value)
    }

    /// Number of retained entries (duplicates included)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is retained
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Retained entries, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &ObservedValue<T>> {
        self.entries.iter()
    }

    /// The retention window
    pub fn retention(&self) -> chrono::Duration {
        self.retention
    }
}

impl<T: fmt::Display> fmt::Display for WindowedSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", entry.value)?;
        }
        f.write_str("]")
    }
}
