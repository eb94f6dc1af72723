//! Verification failure diagnostics.

use super::prelude::*;

fn report_of(err: MockError) -> crate::verify::report::VerificationFailure {
    match err {
        MockError::VerificationFailed(report) => *report,
        other => panic!("expected a verification failure, got {other:?}"),
    }
}

#[test]
fn count_mismatch_carries_the_full_payload() {
    let _serial = serial_guard();
    let mock = mock::<GreeterMock>();
    let ctx = "report-payload";

    let _scope = scoped_context(ctx);
    mock.greet("seen");
    mock.greet("seen");

    let err = verify(&*mock)
        .for_context(ctx)
        .that(times(3), |m| {
            m.greet(&eq("seen".to_string()));
        })
        .expect_err("two calls cannot satisfy times(3)");

    let report = report_of(err);
    assert_eq!(report.observed, 2);
    assert_eq!(report.mock, "Greeter");
    assert!(report.context.contains("report-payload"));
    assert_eq!(report.mode, "exactly 3 time(s)");
    assert!(report.expectation.contains("eq(\"seen\")"));
    assert_eq!(report.recent.len(), 2);
    assert_eq!(report.omitted, 0);
    assert!(!report.tips.is_empty());

    let rendered = report.to_string();
    assert!(rendered.contains("verification failed"));
    assert!(rendered.contains("Greeter::greet"));
}

#[test]
fn zero_observed_failures_get_context_tips() {
    let _serial = serial_guard();
    let mock = mock::<GreeterMock>();
    let ctx = "report-zero";

    let _scope = scoped_context(ctx);
    let err = verify(&*mock)
        .for_context(ctx)
        .that(at_least_once(), |m| {
            m.greet(&any::<String>());
        })
        .expect_err("nothing was called");

    let report = report_of(err);
    assert_eq!(report.observed, 0);
    assert!(report
        .tips
        .iter()
        .any(|tip| tip.contains("set_context") || tip.contains("scoped_context")));
}

#[test]
fn too_many_failures_render_the_overflow() {
    let _serial = serial_guard();
    let mock = mock::<GreeterMock>();
    let ctx = "report-overflow";

    let _scope = scoped_context(ctx);
    for i in 0..13 {
        mock.greet(&format!("caller-{i}"));
    }

    let err = verify(&*mock)
        .for_context(ctx)
        .that(at_most(2), |m| {
            m.greet(&any::<String>());
        })
        .expect_err("thirteen calls exceed at_most(2)");

    let report = report_of(err);
    assert_eq!(report.observed, 13);
    assert_eq!(report.recent.len(), 10);
    assert_eq!(report.omitted, 3);
    assert!(report.to_string().contains("... and 3 more"));
}

#[test]
fn no_interactions_passes_then_fails_after_a_call() {
    let _serial = serial_guard();
    let mock = mock::<GreeterMock>();
    let ctx = "report-nointeractions";

    verify_no_interactions(&*mock, ctx).unwrap();

    let _scope = scoped_context(ctx);
    mock.greet("surprise");
    let err = verify_no_interactions(&*mock, ctx).expect_err("a record exists");
    let report = report_of(err);
    assert_eq!(report.mode, "no interactions");
    assert_eq!(report.observed, 1);
}

#[test]
fn no_more_interactions_tracks_the_verified_flag() {
    let _serial = serial_guard();
    let mock = mock::<GreeterMock>();
    let ctx = "report-nomore";

    let _scope = scoped_context(ctx);
    mock.greet("a");
    mock.greet("b");

    let err = verify_no_more_interactions(&*mock, ctx).expect_err("nothing verified yet");
    assert_eq!(report_of(err).observed, 2);

    verify(&*mock)
        .for_context(ctx)
        .that(times(1), |m| {
            m.greet(&eq("a".to_string()));
        })
        .unwrap();
    let err = verify_no_more_interactions(&*mock, ctx).expect_err("one is still unverified");
    assert_eq!(report_of(err).observed, 1);

    verify(&*mock)
        .for_context(ctx)
        .that(times(1), |m| {
            m.greet(&eq("b".to_string()));
        })
        .unwrap();
    verify_no_more_interactions(&*mock, ctx).unwrap();
}

#[test]
fn verification_against_an_untouched_mock_reports_cleanly() {
    let _serial = serial_guard();
    let mock = mock::<GreeterMock>();
    let err = verify(&*mock)
        .for_context("report-untouched")
        .that(times(1), |m| {
            m.greet(&any::<String>());
        })
        .expect_err("no slot exists yet");
    let report = report_of(err);
    assert_eq!(report.observed, 0);
    assert!(report.recent.is_empty());
    assert!(report.to_string().contains("no invocations recorded"));
}
