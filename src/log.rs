//! Logging shims.
//!
//! With the `tracing` feature on, `debug!` and `warn!` come straight from
//! `tracing`. Without it they expand to nothing, so the query visitors and
//! the render-list compiler pay no logging cost in the default build.

#[cfg(feature = "tracing")]
pub use tracing::{debug, warn};

#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
pub use crate::{debug, warn};
