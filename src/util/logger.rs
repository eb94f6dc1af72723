//! This module provides a built-in logger implementation.
//!
//! The built-in logger implementation uses the `env_logger` crate.  It is
//! enabled by the Cargo feature "builtin_env_logger" which is enabled by
//! default.  When enabled, it is initialized the first time the engine is
//! touched and shows logs of levels INFO or lower (the lower, the more
//! important).
//!
//! This provides a convenient out-of-the-box experience so that test
//! failures come with engine logs without configuration, and log levels can
//! be adjusted through the standard `RUST_LOG` environment variable.  A test
//! suite that integrates its own logging can disable the Cargo feature
//! "builtin_env_logger" and register its own implementation with the `log`
//! crate.

/// Attempt to init an env_logger for the engine.
/// Does nothing if the "builtin_env_logger" feature is disabled.
pub(crate) fn try_init() {
    cfg_if::cfg_if! {
        if #[cfg(feature = "builtin_env_logger")] {
            let result = env_logger::try_init_from_env(
                // By default, show info level logging.
                env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
            );

            match result {
                Ok(()) => {
                    debug!("ctxmock initialized the logger.");
                }
                Err(e) => {
                    // `log::SetLoggerError` can only mean the logger was already initialized.
                    debug!("ctxmock failed to initialize the built-in env_logger: {e}");
                }
            }
        } else {
            debug!("ctxmock didn't initialize the built-in env_logger.  The Cargo feature \"builtin_env_logger\" is not enabled.");
        }
    }
}
