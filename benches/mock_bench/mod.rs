use criterion::Criterion;

pub mod dispatch;
pub mod stubbing;

pub fn bench(c: &mut Criterion) {
    dispatch::bench(c);
    stubbing::bench(c);
}
