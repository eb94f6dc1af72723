use criterion::Criterion;

use ctxmock::matchers::eq;
use ctxmock::util::test_util::doubles::{Greeter, GreeterMock};
use ctxmock::{given, mock, perform_cleanup, scoped_context, set_cleanup_config, CleanupOptions};

pub fn bench(c: &mut Criterion) {
    // Keep the invocation log bounded while criterion hammers the mock.
    let mut options = CleanupOptions::default();
    assert!(options.set("max_invocations_per_context", "1024"));
    assert!(options.set("cleanup_interval_ms", "50"));
    set_cleanup_config(options);

    let mock = mock::<GreeterMock>();
    given(&*mock)
        .for_context("bench-dispatch")
        .when(|m| {
            m.greet(&eq("hot".to_string()));
        })
        .unwrap()
        .then_return("hit".to_string())
        .unwrap();

    let _scope = scoped_context("bench-dispatch");

    c.bench_function("dispatch_stubbed_hit", |b| {
        b.iter(|| mock.greet("hot"));
    });
    perform_cleanup();

    c.bench_function("dispatch_unstubbed_default", |b| {
        b.iter(|| mock.greet("miss"));
    });
    perform_cleanup();
}
