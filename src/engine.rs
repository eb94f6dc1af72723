//! The engine instance: registry, cleanup scheduler, and identity source.

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use crate::context::ContextId;
use crate::mock::{MockKind, MockRef};
use crate::registry::cleanup::CleanupScheduler;
use crate::registry::identity::Referent;
use crate::registry::stats::{CleanupStats, MemoryUsage};
use crate::registry::MockRegistry;
use crate::util::options::CleanupOptions;

lazy_static! {
    // The process-wide engine. Options come from CTXMOCK_* environment
    // variables, falling back to built-in defaults.
    static ref GLOBAL: MockEngine = MockEngine::new(CleanupOptions::from_env());
}

pub(crate) fn global() -> &'static MockEngine {
    &GLOBAL
}

/// One mock state engine: the registry plus its cleanup scheduler. The
/// crate operates on a process-wide instance; the type is public so
/// diagnostics can name it.
pub struct MockEngine {
    registry: Arc<MockRegistry>,
    cleanup: CleanupScheduler,
    start: Instant,
}

impl MockEngine {
    pub(crate) fn new(options: CleanupOptions) -> MockEngine {
        crate::util::logger::try_init();
        let auto = *options.auto_cleanup;
        let engine = MockEngine {
            registry: Arc::new(MockRegistry::new(options)),
            cleanup: CleanupScheduler::new(),
            start: Instant::now(),
        };
        if auto {
            engine.cleanup.start(Arc::clone(&engine.registry));
        }
        info!("engine: initialized (auto_cleanup={})", auto);
        engine
    }

    pub(crate) fn registry(&self) -> &MockRegistry {
        &self.registry
    }

    /// Monotonic offset since engine start; anchors report timestamps.
    pub fn uptime(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stamp a new identity and register the mock.
    pub(crate) fn register_mock(&self, referent: Weak<Referent>, kind: MockKind) -> MockRef {
        let mock = MockRef::new(crate::mock::next_id(), referent, kind);
        self.registry.register(mock.identity_key(), kind);
        mock
    }

    pub(crate) fn cleanup_config(&self) -> CleanupOptions {
        self.registry.options()
    }

    /// Swap the cleanup configuration, bouncing the background thread if
    /// its interval or enablement changed.
    pub(crate) fn set_cleanup_config(&self, options: CleanupOptions) {
        let auto = *options.auto_cleanup;
        self.registry.set_options(options);
        if auto {
            self.cleanup.restart(Arc::clone(&self.registry));
        } else {
            self.cleanup.stop();
        }
    }

    pub(crate) fn enable_auto_cleanup(&self) -> bool {
        let mut options = self.registry.options();
        options.auto_cleanup.set(true);
        self.registry.set_options(options);
        self.cleanup.start(Arc::clone(&self.registry))
    }

    pub(crate) fn disable_auto_cleanup(&self) -> bool {
        let mut options = self.registry.options();
        options.auto_cleanup.set(false);
        self.registry.set_options(options);
        self.cleanup.stop()
    }

    pub(crate) fn perform_cleanup(&self) -> CleanupStats {
        self.registry.sweep(Instant::now())
    }

    pub(crate) fn memory_usage(&self) -> MemoryUsage {
        self.registry.memory_usage()
    }

    pub(crate) fn purge_invocations(&self, mock: &MockRef, ctx: &ContextId) {
        self.registry.purge_invocations(mock, ctx);
    }
}
