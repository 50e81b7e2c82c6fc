//! Domain errors

use thiserror::Error;

use super::value_object::RoomKind;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("{field} has an invalid value '{value}'")]
    Invalid { field: &'static str, value: String },
}

/// Connection Registry / Room table errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Connection '{0}' not found")]
    ConnectionNotFound(String),

    #[error("Room '{0}' not found")]
    RoomNotFound(String),

    #[error("Room '{0}' already exists")]
    RoomAlreadyExists(String),

    #[error("Room '{room_id}' is a {actual:?} room, not a {requested:?} room")]
    RoomKindMismatch {
        room_id: String,
        requested: RoomKind,
        actual: RoomKind,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoteError {
    #[error("A vote accepts at most {max} options (got {given})")]
    TooManyOptions { max: usize, given: usize },

    #[error("A vote needs at least {min} options (got {given})")]
    NotEnoughOptions { min: usize, given: usize },

    #[error("A vote is already active in this room")]
    VoteAlreadyActive,

    #[error("No vote found in this room")]
    VoteNotFound,

    #[error("The vote has already ended")]
    VoteEnded,

    #[error("Unknown option '{0}'")]
    InvalidOption(String),
}

/// Teaching session errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Classroom already has an active session '{0}'")]
    SessionAlreadyActive(String),

    #[error("No active session found")]
    SessionNotFound,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("Connection '{0}' is not registered with the pusher")]
    ClientNotFound(String),

    #[error("Push failed: {0}")]
    PushFailed(String),
}
