use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsmErrorKind {
    InvalidProfile,
    InvalidEntity,
    AccountingViolation,
    Communication,
    ExecutionFailed,
    MissingStatus,
    InvalidState,
    RequirementsNotMet,
}

/// Fatal failure of an audit run. Anything that reaches the caller as
/// `RsmError` stops the traversal; per-entity warnings never do.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RsmError {
    pub kind: RsmErrorKind,
    pub message: String,
}

impl RsmError {
    pub fn new(kind: RsmErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

pub fn invalid_profile(message: impl Into<String>) -> RsmError {
    RsmError::new(RsmErrorKind::InvalidProfile, message)
}

pub fn invalid_entity(message: impl Into<String>) -> RsmError {
    RsmError::new(RsmErrorKind::InvalidEntity, message)
}

pub fn accounting_violation(message: impl Into<String>) -> RsmError {
    RsmError::new(RsmErrorKind::AccountingViolation, message)
}

pub fn communication_failure(message: impl Into<String>) -> RsmError {
    RsmError::new(RsmErrorKind::Communication, message)
}

pub fn execution_failed(message: impl Into<String>) -> RsmError {
    RsmError::new(RsmErrorKind::ExecutionFailed, message)
}

pub fn missing_status(message: impl Into<String>) -> RsmError {
    RsmError::new(RsmErrorKind::MissingStatus, message)
}

pub fn invalid_state(message: impl Into<String>) -> RsmError {
    RsmError::new(RsmErrorKind::InvalidState, message)
}

pub fn requirements_not_met(message: impl Into<String>) -> RsmError {
    RsmError::new(RsmErrorKind::RequirementsNotMet, message)
}
