// Error types for draft rotation operations.

use thiserror::Error;

/// Failures reported synchronously by the rotation engine. Neither variant
/// mutates state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RotationError {
    /// The caller supplied an unusable draft order.
    #[error("validation error: {0}")]
    Validation(String),

    /// The requested transition is not possible from the current state.
    #[error("state error: {0}")]
    State(String),
}

impl RotationError {
    pub fn insufficient_participants() -> Self {
        RotationError::Validation("insufficient participants".into())
    }

    pub fn no_paused_draft() -> Self {
        RotationError::State("no paused draft".into())
    }
}
