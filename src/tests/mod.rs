//! End-to-end scenario tests driving the public surface the way a test
//! suite would: doubles from `util::test_util::doubles`, the free-function
//! API, and real threads for the concurrency scenarios.

mod prelude {
    pub use crate::api::*;
    pub use crate::context::{ContextId, StateValue};
    pub use crate::error::MockError;
    pub use crate::matchers::captor::Captor;
    pub use crate::matchers::*;
    pub use crate::util::test_util::doubles::*;
    pub use crate::util::test_util::{panic_after, serial_guard, serial_test, with_cleanup};
    pub use crate::verify::mode::{at_least, at_least_once, at_most, never, times};
}

mod rule_selection;
mod stubbing_counts;
mod verification_reporting;
