// Some tests are conditionally compiled, so not all the code in this module
// will be used. We simply allow dead code in this module.
#![allow(dead_code)]

use std::sync::Arc;

use atomic::{Atomic, Ordering};

use crate::api::{given, mock};
use crate::context::ContextId;
use crate::matchers::eq;
use crate::util::test_util::doubles::{Greeter, GreeterMock, Session, SessionMock};

pub trait FixtureContent {
    fn create() -> Self;
}

static NEXT_CONTEXT: Atomic<u64> = Atomic::new(0);

/// A context identifier no other test uses. The engine is process-wide, so
/// fixtures take a fresh partition instead of sharing one.
pub fn unique_context(label: &str) -> ContextId {
    let n = NEXT_CONTEXT.fetch_add(1, Ordering::Relaxed);
    ContextId::from(format!("{}-{}", label, n))
}

/// A greeter with one canned reply installed under a fresh context.
pub struct StubbedGreeter {
    pub mock: Arc<GreeterMock>,
    pub ctx: ContextId,
}

impl StubbedGreeter {
    pub const NAME: &'static str = "fixture-caller";
    pub const REPLY: &'static str = "fixture-reply";
}

impl FixtureContent for StubbedGreeter {
    fn create() -> Self {
        let mock = mock::<GreeterMock>();
        let ctx = unique_context("greeter-fixture");
        given(&*mock)
            .for_context(&ctx)
            .when(|m| {
                m.greet(&eq(Self::NAME.to_string()));
            })
            .expect("fixture capture")
            .then_return(Self::REPLY.to_string())
            .expect("fixture stubbing");
        StubbedGreeter { mock, ctx }
    }
}

/// A session with the full login/secret/logout state machine installed
/// under a fresh context.
pub struct StatefulSession {
    pub mock: Arc<SessionMock>,
    pub ctx: ContextId,
}

impl StatefulSession {
    pub const USER: &'static str = "fixture-user";
    pub const PASSWORD: &'static str = "fixture-pass";
    pub const SECRET: &'static str = "fixture-secret";
}

impl FixtureContent for StatefulSession {
    fn create() -> Self {
        let mock = mock::<SessionMock>();
        let ctx = unique_context("session-fixture");
        given(&*mock)
            .for_context(&ctx)
            .when_state_is_unset()
            .when(|m| {
                m.login(&eq(Self::USER.to_string()), &eq(Self::PASSWORD.to_string()));
            })
            .expect("fixture capture")
            .will_set_state_to("LOGGED_IN")
            .then_return(true)
            .expect("fixture stubbing");
        given(&*mock)
            .for_context(&ctx)
            .when_state_is("LOGGED_IN")
            .when(|m| {
                m.secret();
            })
            .expect("fixture capture")
            .then_return(Self::SECRET.to_string())
            .expect("fixture stubbing");
        given(&*mock)
            .for_context(&ctx)
            .when_state_is("LOGGED_IN")
            .when(|m| {
                m.logout();
            })
            .expect("fixture capture")
            .will_set_state_to("LOGGED_OUT")
            .then_default()
            .expect("fixture stubbing");
        StatefulSession { mock, ctx }
    }
}
