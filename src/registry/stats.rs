//! Registry accounting snapshots.

use std::fmt;

/// Point-in-time size of the registry, as reported by `memory_usage()`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoryUsage {
    /// Registered mocks whose referent is still alive.
    pub mocks: usize,
    /// `(mock, context)` slots.
    pub contexts: usize,
    /// Invocation records across all slots.
    pub invocations: usize,
    /// Stubbing rules across all slots.
    pub rules: usize,
    /// State cells currently holding a value.
    pub states: usize,
}

impl fmt::Display for MemoryUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mocks={} contexts={} invocations={} rules={} states={}",
            self.mocks, self.contexts, self.invocations, self.rules, self.states
        )
    }
}

/// What one cleanup pass removed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CleanupStats {
    /// Entries dropped because their mock was reclaimed.
    pub dead_mocks: usize,
    /// Context slots removed together with dead mocks.
    pub purged_contexts: usize,
    /// Rules dropped because their TTL elapsed.
    pub expired_rules: usize,
    /// Records evicted by the age bound or the per-context cap.
    pub evicted_records: usize,
}

impl CleanupStats {
    pub fn is_noop(&self) -> bool {
        *self == CleanupStats::default()
    }
}

impl fmt::Display for CleanupStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dead_mocks={} purged_contexts={} expired_rules={} evicted_records={}",
            self.dead_mocks, self.purged_contexts, self.expired_rules, self.evicted_records
        )
    }
}
