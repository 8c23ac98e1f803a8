//! Error types for diagram composition.
//!
//! Every variant is a programmer-facing contract violation (malformed
//! composition), not a recoverable runtime condition, so callers are
//! expected to propagate them with `?` rather than attempt repair.

use miette::Diagnostic;
use thiserror::Error;

use crate::batch::Size;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by composition, geometric queries, and compilation.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Two batch sizes are not broadcast-compatible.
    #[error("size mismatch: cannot broadcast {left} with {right}")]
    #[diagnostic(code(collage::broadcast::size_mismatch))]
    ShapeMismatch { left: Size, right: Size },

    /// An operation needed a definite envelope but the diagram is empty.
    #[error("{op} requires a definite envelope, but the diagram is empty")]
    #[diagnostic(code(collage::envelope::undefined))]
    EnvelopeUndefined { op: &'static str },

    /// A snug-placement probe ray failed to intersect the diagram boundary.
    #[error("{op}: a probe ray failed to intersect the diagram boundary")]
    #[diagnostic(code(collage::trace::miss))]
    TraceMiss { op: &'static str },

    /// An axis fold was requested on a diagram with no batch axes.
    #[error("{op} requires at least one batch axis")]
    #[diagnostic(code(collage::batch::missing_axis))]
    MissingBatchAxis { op: &'static str },
}
