//! Error types for frame operations.

use dysco_types::FrameId;
use thiserror::Error;

/// Errors that can occur when leaving a frame explicitly.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScopeError {
    /// The frame was removed, but it was not the innermost frame.
    #[error("{frame} exited while {innermost} was still innermost")]
    ExitOutOfOrder { frame: FrameId, innermost: FrameId },

    /// The frame is not on the current thread's call stack.
    #[error("{0} is not active on this thread")]
    FrameNotActive(FrameId),
}

/// Convenience type alias for frame operations.
pub type ScopeResult<T> = std::result::Result<T, ScopeError>;
