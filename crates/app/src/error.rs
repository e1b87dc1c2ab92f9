//! Errors returned to callers of UI commands.

use bristlebot_domain::error::ValidationError;
use bristlebot_domain::state::ConnectionState;

/// Why a UI command was refused. A refused command changes nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// The command is not accepted in the current connection state.
    #[error("{command} is not allowed while {state}")]
    InvalidState {
        /// Name of the refused command.
        command: &'static str,
        /// State the session was in.
        state: ConnectionState,
    },

    /// An argument failed validation.
    #[error("invalid argument")]
    Validation(#[from] ValidationError),

    /// The controller task is no longer running.
    #[error("controller stopped")]
    Stopped,
}
