//! Crate-level error type for dispatch and core construction.

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

/// Every way dispatching or assembling a core can fail.
///
/// None of these are recovered internally. A failure in any pipeline step
/// aborts the construction or dispatch in progress and reaches the caller
/// unchanged.
#[derive(Debug, Error)]
pub enum CoreError {
    /// `dispatch` reached the base core with something that is not an
    /// action record, or with a record that has no `type` key.
    #[error("invalid action: {reason}")]
    InvalidActionKind { reason: &'static str },

    /// A capability asked to act as a listener is missing or is not a
    /// [`Listener`](crate::Listener).
    #[error("capability `{name}` is not a listener")]
    InvalidListenerKind { name: String },

    /// An enhancer name does not resolve to a registered enhancer.
    #[error("`{name}` does not name a registered enhancer")]
    InvalidEnhancerKind { name: String },

    /// A member of a parallel plugin group returned a core other than the
    /// one it was given.
    #[error("plugin {member} in a parallel group returned a different core; parallel plugins must not replace the core")]
    ParallelMutationConflict { member: usize },

    /// Core configuration could not be parsed.
    #[error("invalid core config: {0}")]
    Config(#[from] serde_json::Error),

    /// Failure raised by a plugin, middleware or enhancer body.
    #[error(transparent)]
    Extension(#[from] anyhow::Error),
}
