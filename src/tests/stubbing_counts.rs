//! Setup calls made inside `when(..)` never inflate verification counts.

use super::prelude::*;

#[test]
fn stubbing_does_not_inflate_counts() {
    let _serial = serial_guard();
    let mock = mock::<GreeterMock>();
    let ctx = "counts-c";

    given(&*mock)
        .for_context(ctx)
        .when(|m| {
            m.greet(&eq("Setup".to_string()));
        })
        .unwrap()
        .then_return("ok".to_string())
        .unwrap();

    let _scope = scoped_context(ctx);
    mock.greet("Actual");

    verify(&*mock)
        .for_context(ctx)
        .that(times(1), |m| {
            m.greet(&eq("Actual".to_string()));
        })
        .unwrap();
    verify(&*mock)
        .for_context(ctx)
        .that(never(), |m| {
            m.greet(&eq("Setup".to_string()));
        })
        .unwrap();
}

#[test]
fn verification_captures_are_not_counted_either() {
    let _serial = serial_guard();
    let mock = mock::<GreeterMock>();
    let ctx = "counts-verify";

    let _scope = scoped_context(ctx);
    mock.greet("once");

    for _ in 0..3 {
        verify(&*mock)
            .for_context(ctx)
            .that(times(1), |m| {
                m.greet(&eq("once".to_string()));
            })
            .unwrap();
    }
}

#[test]
fn abandoned_stubbing_leaves_no_setup_record() {
    let _serial = serial_guard();
    let mock = mock::<GreeterMock>();
    let ctx = "counts-abandoned";

    let ongoing = given(&*mock)
        .for_context(ctx)
        .when(|m| {
            m.greet(&eq("orphan".to_string()));
        })
        .unwrap();
    // No terminal operation: dropping the builder must still remove the
    // tentative record.
    drop(ongoing);

    verify_no_interactions(&*mock, ctx).unwrap();
}

#[test]
fn modal_shape_counts_like_that() {
    let _serial = serial_guard();
    let mock = mock::<GreeterMock>();
    let ctx = "counts-modal";

    let _scope = scoped_context(ctx);
    mock.greet("twice");
    mock.greet("twice");

    verify(&*mock)
        .for_context(ctx)
        .with_mode(times(2))
        .when(|m| {
            m.greet(&eq("twice".to_string()));
        })
        .unwrap();
    assert!(verify(&*mock)
        .for_context(ctx)
        .with_mode(never())
        .when(|m| {
            m.greet(&eq("twice".to_string()));
        })
        .is_err());
}

#[test]
fn repeated_verification_is_idempotent() {
    let _serial = serial_guard();
    let mock = mock::<GreeterMock>();
    let ctx = "counts-idempotent";

    let _scope = scoped_context(ctx);
    mock.greet("a");
    mock.greet("a");

    for _ in 0..2 {
        verify(&*mock)
            .for_context(ctx)
            .that(times(2), |m| {
                m.greet(&eq("a".to_string()));
            })
            .unwrap();
    }
    let failed = verify(&*mock)
        .for_context(ctx)
        .that(times(3), |m| {
            m.greet(&eq("a".to_string()));
        });
    assert!(failed.is_err());
}
