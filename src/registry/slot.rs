//! Per-`(mock, context)` storage.
//!
//! Each slot owns its own rule sequence, invocation queue, and state cell.
//! Mutating one slot never requires locking another; the only shared
//! structure above a slot is the top-level index. Rule and log mutation take
//! a short critical section; the state cell is a versioned compare-and-set
//! cell behind a spin lock, giving linearizable transitions for non-`Copy`
//! state values.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::context::StateValue;
use crate::invocation::{InvocationRecord, MethodDescriptor};
use crate::stubbing::rule::StubbingRule;
use crate::values::ArgValue;

/// A consistent view of the state cell: the value plus the version that
/// published it. `compare_and_set` succeeds only while the version is
/// unchanged.
#[derive(Clone, Debug)]
pub struct StateSnapshot {
    pub(crate) version: u64,
    pub value: Option<StateValue>,
}

struct StateInner {
    version: u64,
    value: Option<StateValue>,
}

/// Atomic cell holding the opaque per-`(mock, context)` state. The unset
/// state is `None`.
pub struct StateCell {
    inner: spin::Mutex<StateInner>,
}

impl StateCell {
    fn new() -> StateCell {
        StateCell {
            inner: spin::Mutex::new(StateInner {
                version: 0,
                value: None,
            }),
        }
    }

    pub fn snapshot(&self) -> StateSnapshot {
        let inner = self.inner.lock();
        StateSnapshot {
            version: inner.version,
            value: inner.value.clone(),
        }
    }

    /// Publish `next` iff no transition has been published since the
    /// snapshot that observed `expected_version`.
    pub fn compare_and_set(&self, expected_version: u64, next: Option<StateValue>) -> bool {
        let mut inner = self.inner.lock();
        if inner.version != expected_version {
            return false;
        }
        inner.version += 1;
        inner.value = next;
        true
    }

    /// Publish `next` unconditionally. Used once the bounded CAS retry is
    /// exhausted.
    pub fn force_set(&self, next: Option<StateValue>) {
        let mut inner = self.inner.lock();
        inner.version += 1;
        inner.value = next;
    }

    pub fn is_set(&self) -> bool {
        self.inner.lock().value.is_some()
    }
}

/// Storage owned by one `(mock, context)` pair.
pub struct ContextSlot {
    rules: Mutex<Vec<Arc<StubbingRule>>>,
    log: Mutex<VecDeque<Arc<InvocationRecord>>>,
    state: StateCell,
}

impl ContextSlot {
    pub(crate) fn new() -> ContextSlot {
        ContextSlot {
            rules: Mutex::new(Vec::new()),
            log: Mutex::new(VecDeque::new()),
            state: StateCell::new(),
        }
    }

    pub fn state(&self) -> &StateCell {
        &self.state
    }

    /// Append a rule at the end of the sequence; the selection walk reads
    /// the sequence back-to-front, so later rules shadow earlier ones.
    pub(crate) fn append_rule(&self, rule: Arc<StubbingRule>) {
        let mut rules = self.rules.lock().unwrap();
        trace!("slot: installing rule {:?}", rule);
        rules.push(rule);
    }

    /// Walk the rule sequence newest-first and return the first rule that
    /// admits `(method, args)` under `state`. Rules whose TTL has elapsed
    /// are removed on the way, whether or not a match is found.
    pub(crate) fn select_rule(
        &self,
        method: &MethodDescriptor,
        args: &[ArgValue],
        state: &Option<StateValue>,
        now: Instant,
    ) -> Option<Arc<StubbingRule>> {
        let mut rules = self.rules.lock().unwrap();
        let before = rules.len();
        rules.retain(|rule| !rule.expired(now));
        let dropped = before - rules.len();
        if dropped > 0 {
            debug!("slot: dropped {} expired rule(s) on access", dropped);
        }
        rules
            .iter()
            .rev()
            .find(|rule| rule.admits(method, args, state))
            .cloned()
    }

    /// Drop rules past their TTL without a selection. Returns how many were
    /// removed.
    pub(crate) fn prune_expired_rules(&self, now: Instant) -> usize {
        let mut rules = self.rules.lock().unwrap();
        let before = rules.len();
        rules.retain(|rule| !rule.expired(now));
        before - rules.len()
    }

    pub(crate) fn append_record(&self, record: Arc<InvocationRecord>) {
        self.log.lock().unwrap().push_back(record);
    }

    /// Remove one specific record (by identity). Used to drop tentative
    /// setup records when a stubbing or verification finalizes.
    pub(crate) fn remove_record(&self, record: &Arc<InvocationRecord>) {
        let mut log = self.log.lock().unwrap();
        if let Some(pos) = log.iter().rposition(|r| Arc::ptr_eq(r, record)) {
            log.remove(pos);
        }
    }

    /// An order-preserving snapshot of the whole log, setup records
    /// included.
    pub(crate) fn snapshot_log(&self) -> Vec<Arc<InvocationRecord>> {
        self.log.lock().unwrap().iter().cloned().collect()
    }

    /// An order-preserving snapshot of the records verification may see.
    pub(crate) fn visible_log(&self) -> Vec<Arc<InvocationRecord>> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|record| !record.is_setup())
            .cloned()
            .collect()
    }

    /// Drop every record. Returns how many were removed.
    pub(crate) fn purge_log(&self) -> usize {
        let mut log = self.log.lock().unwrap();
        let purged = log.len();
        log.clear();
        purged
    }

    /// Evict oldest records beyond `cap`.
    pub(crate) fn evict_over(&self, cap: usize) -> usize {
        let mut log = self.log.lock().unwrap();
        let mut evicted = 0;
        while log.len() > cap {
            log.pop_front();
            evicted += 1;
        }
        evicted
    }

    /// Evict records older than `max_age` at `now`.
    pub(crate) fn evict_older_than(&self, max_age: Duration, now: Instant) -> usize {
        let mut log = self.log.lock().unwrap();
        let before = log.len();
        // The queue is FIFO by insertion, so stale records sit at the front.
        while log
            .front()
            .map_or(false, |record| now.duration_since(record.at()) >= max_age)
        {
            log.pop_front();
        }
        before - log.len()
    }

    pub(crate) fn rule_count(&self) -> usize {
        self.rules.lock().unwrap().len()
    }

    pub(crate) fn record_count(&self) -> usize {
        self.log.lock().unwrap().len()
    }
}
