//! The mock registry: the central concurrent store.
//!
//! Top-level indexes are keyed by [`IdentityKey`](identity::IdentityKey) and
//! allow per-bucket updates; each `(mock, context)` pair owns a
//! [slot](slot::ContextSlot) with its own rule sequence, invocation queue,
//! and state cell, so writers to distinct pairs never contend beyond the
//! top-level map. The registry also owns the cleanup configuration and the
//! sweep that the [cleanup engine](cleanup) drives.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use static_assertions::assert_impl_all;

use crate::context::ContextId;
use crate::mock::{MockKind, MockRef};
use crate::util::options::CleanupOptions;

pub mod cleanup;
pub mod identity;
pub mod slot;
pub mod stats;

use self::identity::IdentityKey;
use self::slot::ContextSlot;
use self::stats::{CleanupStats, MemoryUsage};

/// Everything the registry holds for one mock instance. The identity key
/// lives in the top-level index; the entry only owns the per-context slots.
pub struct MockEntry {
    kind: MockKind,
    contexts: RwLock<HashMap<ContextId, Arc<ContextSlot>>>,
}

impl MockEntry {
    fn new(kind: MockKind) -> MockEntry {
        MockEntry {
            kind,
            contexts: RwLock::new(HashMap::new()),
        }
    }

    pub fn kind(&self) -> MockKind {
        self.kind
    }

    /// The slot for `ctx`, created on first use.
    pub(crate) fn slot(&self, ctx: &ContextId) -> Arc<ContextSlot> {
        if let Some(slot) = self.contexts.read().unwrap().get(ctx) {
            return Arc::clone(slot);
        }
        let mut contexts = self.contexts.write().unwrap();
        Arc::clone(
            contexts
                .entry(ctx.clone())
                .or_insert_with(|| Arc::new(ContextSlot::new())),
        )
    }

    pub(crate) fn try_slot(&self, ctx: &ContextId) -> Option<Arc<ContextSlot>> {
        self.contexts.read().unwrap().get(ctx).map(Arc::clone)
    }

    fn slots(&self) -> Vec<Arc<ContextSlot>> {
        self.contexts.read().unwrap().values().map(Arc::clone).collect()
    }

    fn context_count(&self) -> usize {
        self.contexts.read().unwrap().len()
    }
}

/// The concurrent `(mock, context)` store plus its cleanup configuration.
pub struct MockRegistry {
    mocks: RwLock<HashMap<IdentityKey, Arc<MockEntry>>>,
    options: RwLock<CleanupOptions>,
}

assert_impl_all!(MockRegistry: Send, Sync);
assert_impl_all!(ContextSlot: Send, Sync);

impl MockRegistry {
    pub(crate) fn new(options: CleanupOptions) -> MockRegistry {
        MockRegistry {
            mocks: RwLock::new(HashMap::new()),
            options: RwLock::new(options),
        }
    }

    pub(crate) fn options(&self) -> CleanupOptions {
        self.options.read().unwrap().clone()
    }

    pub(crate) fn set_options(&self, options: CleanupOptions) {
        *self.options.write().unwrap() = options;
    }

    /// Install the entry for a freshly created mock. Racing registrations
    /// of the same key keep the first entry.
    pub(crate) fn register(&self, key: IdentityKey, kind: MockKind) -> Arc<MockEntry> {
        let mut mocks = self.mocks.write().unwrap();
        debug!("registry: registering {:?} as {:?}", key, kind);
        Arc::clone(
            mocks
                .entry(key)
                .or_insert_with(|| Arc::new(MockEntry::new(kind))),
        )
    }

    pub(crate) fn entry(&self, mock: &MockRef) -> Option<Arc<MockEntry>> {
        self.mocks
            .read()
            .unwrap()
            .get(&mock.identity_key())
            .map(Arc::clone)
    }

    /// The entry for `mock`, re-registering it if a clear removed it.
    pub(crate) fn entry_or_register(&self, mock: &MockRef) -> Arc<MockEntry> {
        if let Some(entry) = self.entry(mock) {
            return entry;
        }
        self.register(mock.identity_key(), mock.kind())
    }

    /// The slot for `(mock, ctx)`, created on first use.
    pub(crate) fn slot(&self, mock: &MockRef, ctx: &ContextId) -> Arc<ContextSlot> {
        self.entry_or_register(mock).slot(ctx)
    }

    /// Drop every rule, record, and state cell of `mock`. Returns whether
    /// an entry existed.
    pub(crate) fn clear_mock(&self, mock: &MockRef) -> bool {
        let removed = self.mocks.write().unwrap().remove(&mock.identity_key());
        if removed.is_some() {
            info!("registry: cleared mock {}", mock.id());
        }
        removed.is_some()
    }

    /// Drop everything.
    pub(crate) fn clear_all(&self) {
        let mut mocks = self.mocks.write().unwrap();
        info!("registry: clearing {} mock entr(ies)", mocks.len());
        mocks.clear();
    }

    /// Purge the invocation log of `(mock, ctx)`. Rules and state survive;
    /// this backs the context-release policy of the scope.
    pub(crate) fn purge_invocations(&self, mock: &MockRef, ctx: &ContextId) -> usize {
        let Some(entry) = self.entry(mock) else {
            return 0;
        };
        let Some(slot) = entry.try_slot(ctx) else {
            return 0;
        };
        let purged = slot.purge_log();
        if purged > 0 {
            debug!(
                "registry: purged {} record(s) for mock {} in {:?}",
                purged,
                mock.id(),
                ctx
            );
        }
        purged
    }

    pub(crate) fn memory_usage(&self) -> MemoryUsage {
        let mocks = self.mocks.read().unwrap();
        let mut usage = MemoryUsage::default();
        for (key, entry) in mocks.iter() {
            if key.is_live() {
                usage.mocks += 1;
            }
            for slot in entry.slots() {
                usage.contexts += 1;
                usage.invocations += slot.record_count();
                usage.rules += slot.rule_count();
                if slot.state().is_set() {
                    usage.states += 1;
                }
            }
        }
        usage
    }

    /// One full cleanup pass: reclaimed-referent sweep, expired-rule sweep,
    /// age-based eviction, size-based eviction.
    pub(crate) fn sweep(&self, now: Instant) -> CleanupStats {
        let options = self.options();
        let max_invocations = *options.max_invocations_per_context;
        let max_age = Duration::from_millis(*options.max_age_ms);

        let mut cleanup = CleanupStats::default();

        // Reclaimed-referent sweep: drop entries whose mock is gone.
        {
            let mut mocks = self.mocks.write().unwrap();
            mocks.retain(|key, entry| {
                if key.is_live() {
                    return true;
                }
                cleanup.dead_mocks += 1;
                cleanup.purged_contexts += entry.context_count();
                false
            });
        }

        // Per-slot maintenance on the survivors, outside the top-level lock.
        let entries: Vec<Arc<MockEntry>> = {
            let mocks = self.mocks.read().unwrap();
            mocks.values().map(Arc::clone).collect()
        };
        for entry in entries {
            for slot in entry.slots() {
                cleanup.expired_rules += slot.prune_expired_rules(now);
                cleanup.evicted_records += slot.evict_older_than(max_age, now);
                cleanup.evicted_records += slot.evict_over(max_invocations);
            }
        }

        if !cleanup.is_noop() {
            debug!("registry: cleanup pass removed {}", cleanup);
        }
        cleanup
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockRef;

    fn registry() -> MockRegistry {
        MockRegistry::new(CleanupOptions::default())
    }

    fn fresh_mock(registry: &MockRegistry) -> (Arc<dyn std::any::Any + Send + Sync>, MockRef) {
        let body: Arc<dyn std::any::Any + Send + Sync> = Arc::new("double".to_string());
        let mock = MockRef::for_tests(Arc::downgrade(&body), MockKind::Mock);
        registry.register(mock.identity_key(), mock.kind());
        (body, mock)
    }

    #[test]
    fn slots_are_created_per_context_and_shared() {
        let registry = registry();
        let (_body, mock) = fresh_mock(&registry);
        let ctx_a = ContextId::from("a");
        let ctx_b = ContextId::from("b");

        let slot_a = registry.slot(&mock, &ctx_a);
        let slot_a2 = registry.slot(&mock, &ctx_a);
        let slot_b = registry.slot(&mock, &ctx_b);
        assert!(Arc::ptr_eq(&slot_a, &slot_a2));
        assert!(!Arc::ptr_eq(&slot_a, &slot_b));
        assert_eq!(registry.memory_usage().contexts, 2);
    }

    #[test]
    fn clear_mock_removes_the_entry() {
        let registry = registry();
        let (_body, mock) = fresh_mock(&registry);
        registry.slot(&mock, &ContextId::from("a"));
        assert!(registry.clear_mock(&mock));
        assert!(!registry.clear_mock(&mock));
        assert_eq!(registry.memory_usage().contexts, 0);
    }

    #[test]
    fn dead_mock_sweep_drops_everything() {
        let registry = registry();
        let (body, mock) = fresh_mock(&registry);
        registry.slot(&mock, &ContextId::from("a"));
        registry.slot(&mock, &ContextId::from("b"));

        drop(body);
        let stats = registry.sweep(Instant::now());
        assert_eq!(stats.dead_mocks, 1);
        assert_eq!(stats.purged_contexts, 2);
        assert_eq!(registry.memory_usage(), MemoryUsage::default());
    }

    #[test]
    fn reclaimed_mock_is_invisible_before_sweep() {
        let registry = registry();
        let (body, mock) = fresh_mock(&registry);
        registry.slot(&mock, &ContextId::from("a"));
        drop(body);
        // Key equality fails once the referent is gone, so lookups miss.
        assert!(registry.entry(&mock).is_none());
        assert_eq!(registry.memory_usage().mocks, 0);
    }
}
