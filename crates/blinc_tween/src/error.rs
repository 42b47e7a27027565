//! Tween error types

use crate::plugins::ValueShape;
use thiserror::Error;

/// Errors reported by tween operations
///
/// None of these are fatal. The scheduler logs every error it produces and
/// degrades to skipping (or killing) the single unit involved.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TweenError {
    /// The handle refers to a unit that was retired or never existed
    #[error("tween handle is no longer alive")]
    InvalidHandle,

    /// The getter or setter could not reach the animated value
    #[error("target unavailable: {0}")]
    TargetUnavailable(String),

    /// A typed operation was given a value of the wrong shape
    #[error("value type mismatch: tween animates {expected:?}, got {found}")]
    ValueTypeMismatch {
        expected: ValueShape,
        found: &'static str,
    },

    /// The unit is owned by a sequence and can only be driven by it
    #[error("operation not allowed on a tween nested inside a sequence")]
    Sequenced,

    /// The unit was already started or added to a sequence
    #[error("operation not allowed after the tween was locked")]
    Locked,

    /// Illegal sequence construction
    #[error("invalid sequence operation: {0}")]
    InvalidSequence(&'static str),

    /// A user callback, getter or setter panicked
    #[error("callback panicked: {0}")]
    CallbackPanicked(String),
}

impl TweenError {
    /// Shorthand for [`TweenError::TargetUnavailable`]
    pub fn target_gone(reason: impl Into<String>) -> Self {
        TweenError::TargetUnavailable(reason.into())
    }
}
