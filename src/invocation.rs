//! Invocation records and method descriptors.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::ThreadId;
use std::time::{Duration, Instant};

use atomic::Atomic;

use crate::context::ContextId;
use crate::registry::identity::MockId;
use crate::values::ArgValue;

/// A type-qualified method name plus its parameter type list, unique within
/// a mock type. Doubles declare one `const` descriptor per method.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    owner: &'static str,
    name: &'static str,
    params: &'static [&'static str],
}

impl MethodDescriptor {
    pub const fn new(
        owner: &'static str,
        name: &'static str,
        params: &'static [&'static str],
    ) -> MethodDescriptor {
        MethodDescriptor { owner, name, params }
    }

    pub fn owner(&self) -> &'static str {
        self.owner
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn params(&self) -> &'static [&'static str] {
        self.params
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}({})", self.owner, self.name, self.params.join(", "))
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

static NEXT_SEQ: Atomic<u64> = Atomic::new(0);

/// An immutable description of one intercepted call. Only the `verified`
/// bit changes after publication, flipped monotonically by verification.
pub struct InvocationRecord {
    mock: MockId,
    method: MethodDescriptor,
    args: Vec<ArgValue>,
    context: ContextId,
    at: Instant,
    since_start: Duration,
    thread: ThreadId,
    matcher_notes: Vec<String>,
    verified: AtomicBool,
    setup: bool,
    seq: u64,
}

impl InvocationRecord {
    pub(crate) fn new(
        mock: MockId,
        method: MethodDescriptor,
        args: Vec<ArgValue>,
        context: ContextId,
        since_start: Duration,
        matcher_notes: Vec<String>,
        setup: bool,
    ) -> InvocationRecord {
        InvocationRecord {
            mock,
            method,
            args,
            context,
            at: Instant::now(),
            since_start,
            thread: std::thread::current().id(),
            matcher_notes,
            verified: AtomicBool::new(false),
            setup,
            seq: NEXT_SEQ.fetch_add(1, atomic::Ordering::Relaxed),
        }
    }

    pub fn mock(&self) -> MockId {
        self.mock
    }

    pub fn method(&self) -> &MethodDescriptor {
        &self.method
    }

    pub fn args(&self) -> &[ArgValue] {
        &self.args
    }

    pub fn context(&self) -> &ContextId {
        &self.context
    }

    pub fn at(&self) -> Instant {
        self.at
    }

    /// Offset from engine start, for human-readable reports.
    pub fn since_start(&self) -> Duration {
        self.since_start
    }

    pub fn thread(&self) -> ThreadId {
        self.thread
    }

    /// Descriptions of the matchers that were pending on the capture channel
    /// when this call was intercepted. Empty for ordinary runtime calls.
    pub fn matcher_notes(&self) -> &[String] {
        &self.matcher_notes
    }

    pub fn is_verified(&self) -> bool {
        self.verified.load(Ordering::Acquire)
    }

    pub(crate) fn mark_verified(&self) {
        self.verified.store(true, Ordering::Release);
    }

    /// Whether this record was produced by a capture-mode (setup) call.
    /// Setup records are removed when the initiator finalizes; the flag
    /// keeps a concurrent reader from counting one in the meantime.
    pub(crate) fn is_setup(&self) -> bool {
        self.setup
    }

    /// Global publication sequence, strictly increasing per record.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub(crate) fn render_args(&self) -> String {
        let rendered: Vec<&str> = self.args.iter().map(|a| a.rendered()).collect();
        rendered.join(", ")
    }
}

impl fmt::Debug for InvocationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}::{}({}) ctx={:?} t+{}ms thread={:?}",
            self.method.owner(),
            self.method.name(),
            self.render_args(),
            self.context,
            self.since_start.as_millis(),
            self.thread,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PING: MethodDescriptor = MethodDescriptor::new("Probe", "ping", &["String", "u32"]);

    fn record(args: Vec<ArgValue>) -> InvocationRecord {
        InvocationRecord::new(
            MockId::from_raw(1),
            PING,
            args,
            ContextId::from("ctx"),
            Duration::from_millis(42),
            Vec::new(),
            false,
        )
    }

    #[test]
    fn descriptor_display() {
        assert_eq!(PING.to_string(), "Probe::ping(String, u32)");
        assert_eq!(PING.arity(), 2);
    }

    #[test]
    fn verified_bit_is_monotonic() {
        let r = record(vec![ArgValue::of("x".to_string())]);
        assert!(!r.is_verified());
        r.mark_verified();
        r.mark_verified();
        assert!(r.is_verified());
    }

    #[test]
    fn sequence_is_strictly_increasing() {
        let a = record(Vec::new());
        let b = record(Vec::new());
        assert!(b.seq() > a.seq());
    }

    #[test]
    fn args_render_in_order() {
        let r = record(vec![ArgValue::of("x".to_string()), ArgValue::of(9u32)]);
        assert_eq!(r.render_args(), "\"x\", 9");
    }
}
