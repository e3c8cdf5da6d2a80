use thiserror::Error;

/// Recoverable failures while leaving the setup screen.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetupError {
    #[error("please enter a participant ID before starting")]
    EmptyParticipantId,
}
