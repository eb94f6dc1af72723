use criterion::{BatchSize, Criterion};

use ctxmock::matchers::eq;
use ctxmock::util::test_util::doubles::{Greeter, GreeterMock};
use ctxmock::{clear_mock, given, mock};

pub fn bench(c: &mut Criterion) {
    let mock = mock::<GreeterMock>();

    c.bench_function("install_rule", |b| {
        b.iter_batched(
            // Start every iteration from an empty rule sequence so the
            // capture protocol dominates, not the growing walk.
            || {
                clear_mock(&*mock);
            },
            |_| {
                given(&*mock)
                    .for_context("bench-stubbing")
                    .when(|m| {
                        m.greet(&eq("target".to_string()));
                    })
                    .unwrap()
                    .then_return("ok".to_string())
                    .unwrap();
            },
            BatchSize::SmallInput,
        );
    });
}
