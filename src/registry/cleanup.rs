//! Background cleanup engine.
//!
//! When auto-cleanup is enabled, a detached thread runs one
//! [sweep](super::MockRegistry::sweep) per `cleanup_interval_ms` tick. The
//! engine works fully without it — every sweep is also reachable through
//! `perform_cleanup()` — and stopping never joins the thread, so process
//! shutdown cannot block on the scheduler.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crossbeam::channel::{bounded, tick, Sender};
use crossbeam::select;

use crate::registry::MockRegistry;

struct RunningCleanup {
    shutdown: Sender<()>,
}

/// Owner of the background cleanup thread, if one is running.
pub struct CleanupScheduler {
    inner: Mutex<Option<RunningCleanup>>,
}

impl CleanupScheduler {
    pub(crate) fn new() -> CleanupScheduler {
        CleanupScheduler {
            inner: Mutex::new(None),
        }
    }

    /// Spawn the cleanup thread with the registry's current interval.
    /// Returns false if it was already running.
    pub(crate) fn start(&self, registry: Arc<MockRegistry>) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.is_some() {
            return false;
        }

        let interval = Duration::from_millis(*registry.options().cleanup_interval_ms);
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        info!("cleanup: starting background thread, tick every {:?}", interval);

        std::thread::Builder::new()
            .name("ctxmock-cleanup".into())
            .spawn(move || {
                let ticker = tick(interval);
                loop {
                    select! {
                        recv(ticker) -> _ => {
                            let stats = registry.sweep(Instant::now());
                            if !stats.is_noop() {
                                debug!("cleanup: tick removed {}", stats);
                            }
                        }
                        recv(shutdown_rx) -> _ => {
                            debug!("cleanup: background thread shutting down");
                            break;
                        }
                    }
                }
            })
            .expect("failed to spawn the cleanup thread");

        *inner = Some(RunningCleanup {
            shutdown: shutdown_tx,
        });
        true
    }

    /// Signal the thread to exit. The thread is detached; nothing waits for
    /// it. Returns false if it was not running.
    pub(crate) fn stop(&self) -> bool {
        let Some(running) = self.inner.lock().unwrap().take() else {
            return false;
        };
        // The thread may already be gone; a closed channel is fine.
        let _ = running.shutdown.send(());
        info!("cleanup: background thread stopped");
        true
    }

    pub(crate) fn is_running(&self) -> bool {
        self.inner.lock().unwrap().is_some()
    }

    /// Apply a changed interval by bouncing the thread.
    pub(crate) fn restart(&self, registry: Arc<MockRegistry>) {
        self.stop();
        self.start(registry);
    }
}

impl Drop for CleanupScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::options::CleanupOptions;

    #[test]
    fn start_stop_cycle() {
        let mut options = CleanupOptions::default();
        assert!(options.set("cleanup_interval_ms", "20"));
        let registry = Arc::new(MockRegistry::new(options));

        let scheduler = CleanupScheduler::new();
        assert!(!scheduler.is_running());
        assert!(scheduler.start(Arc::clone(&registry)));
        assert!(scheduler.is_running());
        // Second start is a no-op.
        assert!(!scheduler.start(Arc::clone(&registry)));
        assert!(scheduler.stop());
        assert!(!scheduler.stop());
        assert!(!scheduler.is_running());
    }

    #[test]
    fn background_ticks_sweep_the_registry() {
        let mut options = CleanupOptions::default();
        assert!(options.set("cleanup_interval_ms", "10"));
        let registry = Arc::new(MockRegistry::new(options));

        // Register a mock and drop its referent so a tick has work to do.
        let body: Arc<dyn std::any::Any + Send + Sync> = Arc::new("double".to_string());
        let mock = crate::mock::MockRef::for_tests(
            Arc::downgrade(&body),
            crate::mock::MockKind::Mock,
        );
        registry.register(mock.identity_key(), mock.kind());
        drop(body);

        let scheduler = CleanupScheduler::new();
        scheduler.start(Arc::clone(&registry));
        let deadline = Instant::now() + Duration::from_secs(2);
        while registry.memory_usage().contexts != 0
            || registry.mocks.read().unwrap().len() != 0
        {
            assert!(Instant::now() < deadline, "cleanup tick never swept");
            std::thread::sleep(Duration::from_millis(5));
        }
        scheduler.stop();
    }
}
