//! Cleanup engine options.
//!
//! Each option carries a built-in default and a validator, and can be
//! overridden through environment variables with the `CTXMOCK_` prefix
//! (`CTXMOCK_MAX_AGE_MS=1000`) or at runtime through
//! [`crate::api::set_cleanup_config`]. To read the value of an option,
//! simply dereference it (for example, `*options.max_age_ms`).

use std::fmt::Debug;
use std::str::FromStr;

/// Prefix of the environment variables the options reader recognizes.
pub const ENV_PREFIX: &str = "CTXMOCK_";

/// One engine option: the value plus a validator that guards every update.
#[derive(Clone)]
pub struct EngineOption<T: Debug + Clone> {
    value: T,
    validator: fn(&T) -> bool,
}

impl<T: Debug + Clone> EngineOption<T> {
    fn new(value: T, validator: fn(&T) -> bool) -> Self {
        EngineOption { value, validator }
    }

    /// Set the option to the given value. Returns true if the value is
    /// valid, and we set the option to the value.
    pub fn set(&mut self, value: T) -> bool {
        if (self.validator)(&value) {
            self.value = value;
            return true;
        }
        warn!("rejecting invalid option value {:?}", value);
        false
    }
}

// Dereference an option to get its value.
impl<T: Debug + Clone> std::ops::Deref for EngineOption<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

macro_rules! options {
    ($($(#[$doc:meta])* $name:ident: $ty:ty [$validator:expr] = $default:expr),* $(,)?) => {
        /// The cleanup configuration recognized by the registry.
        #[derive(Clone)]
        pub struct CleanupOptions {
            $($(#[$doc])* pub $name: EngineOption<$ty>),*
        }

        impl CleanupOptions {
            /// Set an option by key from its string representation. Returns
            /// false for unknown keys, unparsable values, and values the
            /// validator rejects.
            pub fn set(&mut self, key: &str, value: &str) -> bool {
                match key {
                    $(stringify!($name) => match <$ty as FromStr>::from_str(value) {
                        Ok(value) => self.$name.set(value),
                        Err(_) => {
                            warn!("option {}: cannot parse {:?}", key, value);
                            false
                        }
                    },)*
                    _ => {
                        warn!("unknown option key {:?}", key);
                        false
                    }
                }
            }

            /// Apply every `CTXMOCK_*` environment variable to these
            /// options. Invalid settings are logged and skipped.
            pub fn read_env_var_settings(&mut self) {
                for (key, value) in std::env::vars() {
                    if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                        let option_key = stripped.to_lowercase();
                        if self.set(&option_key, &value) {
                            info!("option {} set to {} from the environment", option_key, value);
                        } else {
                            warn!("ignoring environment setting {}={}", key, value);
                        }
                    }
                }
            }

            /// Built-in defaults overridden by environment variables.
            pub fn from_env() -> Self {
                let mut options = Self::default();
                options.read_env_var_settings();
                options
            }
        }

        impl Default for CleanupOptions {
            fn default() -> Self {
                CleanupOptions {
                    $($name: EngineOption::new($default, $validator)),*
                }
            }
        }

        impl Debug for CleanupOptions {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct("CleanupOptions")
                    $(.field(stringify!($name), &*self.$name))*
                    .finish()
            }
        }
    };
}

options! {
    /// Evict the oldest records of a `(mock, context)` log beyond this many.
    max_invocations_per_context: usize [|v| *v > 0] = 10_000,
    /// Drop records older than this many milliseconds.
    max_age_ms: u64 [|v| *v > 0] = 300_000,
    /// Background cleanup tick period.
    cleanup_interval_ms: u64 [|v| *v > 0] = 60_000,
    /// Whether the background cleanup thread runs at all.
    auto_cleanup: bool [|_| true] = true,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = CleanupOptions::default();
        assert_eq!(*options.max_invocations_per_context, 10_000);
        assert_eq!(*options.max_age_ms, 300_000);
        assert_eq!(*options.cleanup_interval_ms, 60_000);
        assert!(*options.auto_cleanup);
    }

    #[test]
    fn set_parses_and_validates() {
        let mut options = CleanupOptions::default();
        assert!(options.set("max_age_ms", "1500"));
        assert_eq!(*options.max_age_ms, 1500);

        // Zero is rejected by the validator; the old value stays.
        assert!(!options.set("max_age_ms", "0"));
        assert_eq!(*options.max_age_ms, 1500);

        assert!(!options.set("max_age_ms", "soon"));
        assert!(!options.set("no_such_option", "1"));

        assert!(options.set("auto_cleanup", "false"));
        assert!(!*options.auto_cleanup);
    }

    #[test]
    fn environment_overrides_apply() {
        let _serial = crate::util::test_util::serial_guard();
        // Touch the engine first so its own option loading cannot observe
        // the variables this test plants.
        let _ = crate::api::memory_usage();

        std::env::set_var("CTXMOCK_MAX_AGE_MS", "12345");
        std::env::set_var("CTXMOCK_AUTO_CLEANUP", "false");
        std::env::set_var("CTXMOCK_NO_SUCH_OPTION", "1");
        let options = CleanupOptions::from_env();
        std::env::remove_var("CTXMOCK_MAX_AGE_MS");
        std::env::remove_var("CTXMOCK_AUTO_CLEANUP");
        std::env::remove_var("CTXMOCK_NO_SUCH_OPTION");

        assert_eq!(*options.max_age_ms, 12_345);
        assert!(!*options.auto_cleanup);
        // Unknown keys are skipped; untouched options keep their defaults.
        assert_eq!(*options.max_invocations_per_context, 10_000);
    }

    #[test]
    fn typed_setter_validates_too() {
        let mut options = CleanupOptions::default();
        assert!(!options.max_invocations_per_context.set(0));
        assert!(options.max_invocations_per_context.set(5));
        assert_eq!(*options.max_invocations_per_context, 5);
    }
}
