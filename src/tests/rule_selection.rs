//! Rule selection: LIFO among matching rules, guard interplay, and the
//! worked state-transition edge cases.

use super::prelude::*;
use crate::util::test_util::fixtures::{FixtureContent, StatefulSession, StubbedGreeter};

#[test]
fn later_wildcard_shadows_earlier_literal() {
    let _serial = serial_guard();
    let fixture = StubbedGreeter::create();

    // The fixture installed a literal rule; a wildcard installed later
    // shadows it even though the literal is more specific.
    given(&*fixture.mock)
        .for_context(&fixture.ctx)
        .when(|m| {
            m.greet(&any::<String>());
        })
        .unwrap()
        .then_return("wildcard".to_string())
        .unwrap();

    let _scope = scoped_context(&fixture.ctx);
    assert_eq!(fixture.mock.greet(StubbedGreeter::NAME), "wildcard");
}

#[test]
fn non_matching_later_rules_yield_to_earlier_matches() {
    let _serial = serial_guard();
    let fixture = StubbedGreeter::create();

    given(&*fixture.mock)
        .for_context(&fixture.ctx)
        .when(|m| {
            m.greet(&eq("somebody else".to_string()));
        })
        .unwrap()
        .then_return("not for you".to_string())
        .unwrap();

    let _scope = scoped_context(&fixture.ctx);
    // The newest rule does not match this argument; the walk continues to
    // the fixture's literal rule.
    assert_eq!(fixture.mock.greet(StubbedGreeter::NAME), StubbedGreeter::REPLY);
}

#[test]
fn guarded_later_rules_are_skipped_while_the_guard_fails() {
    let _serial = serial_guard();
    let fixture = StatefulSession::create();

    // Later rule, but only for LOGGED_OUT; while unset the fixture's
    // unset-guarded login rule still fires.
    given(&*fixture.mock)
        .for_context(&fixture.ctx)
        .when_state_is("LOGGED_OUT")
        .when(|m| {
            m.login(&any::<String>(), &any::<String>());
        })
        .unwrap()
        .then_return(false)
        .unwrap();

    let _scope = scoped_context(&fixture.ctx);
    assert!(fixture
        .mock
        .login(StatefulSession::USER, StatefulSession::PASSWORD));
}

#[test]
fn matched_rule_without_transition_leaves_state_unchanged() {
    let _serial = serial_guard();
    let fixture = StatefulSession::create();

    let _scope = scoped_context(&fixture.ctx);
    assert!(fixture
        .mock
        .login(StatefulSession::USER, StatefulSession::PASSWORD));
    // secret() has no next_state: the LOGGED_IN guard keeps admitting.
    assert_eq!(fixture.mock.secret(), StatefulSession::SECRET);
    assert_eq!(fixture.mock.secret(), StatefulSession::SECRET);
}

#[test]
fn unmatched_calls_do_not_disturb_state() {
    let _serial = serial_guard();
    let fixture = StatefulSession::create();

    let _scope = scoped_context(&fixture.ctx);
    assert!(fixture
        .mock
        .login(StatefulSession::USER, StatefulSession::PASSWORD));
    // No rule matches bogus credentials in LOGGED_IN; zero value comes
    // back and the state survives.
    assert!(!fixture.mock.login("bogus", "creds"));
    assert_eq!(fixture.mock.secret(), StatefulSession::SECRET);
}

#[test]
fn expired_rules_unshadow_older_ones() {
    let _serial = serial_guard();
    let mock = mock::<GreeterMock>();
    let ctx = "select-unshadow";

    given(&*mock)
        .for_context(ctx)
        .when(|m| {
            m.greet(&eq("x".to_string()));
        })
        .unwrap()
        .then_return("durable".to_string())
        .unwrap();
    given(&*mock)
        .for_context(ctx)
        .ttl_ms(50)
        .when(|m| {
            m.greet(&eq("x".to_string()));
        })
        .unwrap()
        .then_return("fleeting".to_string())
        .unwrap();

    let _scope = scoped_context(ctx);
    assert_eq!(mock.greet("x"), "fleeting");
    std::thread::sleep(std::time::Duration::from_millis(80));
    // Once the shadowing rule expires, the older one is selectable again.
    assert_eq!(mock.greet("x"), "durable");
}

#[test]
fn zero_argument_methods_match_by_descriptor_alone() {
    let _serial = serial_guard();
    let mock = mock::<SessionMock>();
    let ctx = "select-zeroarg";

    given(&*mock)
        .for_context(ctx)
        .when(|m| {
            m.secret();
        })
        .unwrap()
        .then_return("bare".to_string())
        .unwrap();

    let _scope = scoped_context(ctx);
    assert_eq!(mock.secret(), "bare");
    // A different zero-argument method is not confused with it.
    mock.logout();
    assert_eq!(mock.secret(), "bare");
}
