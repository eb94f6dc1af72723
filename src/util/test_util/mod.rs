//! Test support: serialization of context-sensitive tests, panic-safe
//! cleanup, and the hand-written sample doubles.

use std::panic;
use std::sync::{mpsc, Mutex};
use std::thread;
use std::time::Duration;

#[cfg(any(test, feature = "mock_test"))]
pub mod doubles;
#[cfg(any(test, feature = "mock_test"))]
pub mod fixtures;

// https://github.com/rust-lang/rfcs/issues/2798#issuecomment-552949300
pub fn panic_after<T, F>(millis: u64, f: F) -> T
where
    T: Send + 'static,
    F: FnOnce() -> T,
    F: Send + 'static,
{
    let (done_tx, done_rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        let val = f();
        done_tx.send(()).expect("Unable to send completion signal");
        val
    });

    match done_rx.recv_timeout(Duration::from_millis(millis)) {
        Ok(_) => handle.join().expect("Thread panicked"),
        Err(e) => panic!("Thread took too long: {}", e),
    }
}

lazy_static! {
    // A global lock to make tests serial. The engine is process-wide:
    // tests that install rules, sweep, or reconfigure cleanup would
    // otherwise interleave through the shared registry.
    static ref SERIAL_TEST_LOCK: Mutex<()> = Mutex::default();
}

/// Hold the serial-test lock for the rest of the test.
pub fn serial_guard() -> std::sync::MutexGuard<'static, ()> {
    // If one test fails, the lock will become poisoned. We would want to continue for other tests anyway.
    SERIAL_TEST_LOCK
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

// force some tests to be executed serially
pub fn serial_test<F>(f: F)
where
    F: FnOnce(),
{
    let _guard = serial_guard();
    f();
}

// Always execute a cleanup closure no matter the test panics or not.
pub fn with_cleanup<T, C>(test: T, cleanup: C)
where
    T: FnOnce() + panic::UnwindSafe,
    C: FnOnce(),
{
    let res = panic::catch_unwind(test);
    cleanup();
    if let Err(e) = res {
        panic::resume_unwind(e);
    }
}
