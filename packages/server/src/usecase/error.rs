//! UseCase エラー
//!
//! 全てのハンドラーは `Result<_, CoordinatorError>` を返し、UI 層で ack に変換される。
//! どのエラーも接続を閉じることはない。

use thiserror::Error;

use crate::domain::{RegistryError, RoomId, SessionError, ValueObjectError, VoteError};

pub const MISSING_REQUIRED_FIELDS: &str = "Missing required fields";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinatorError {
    /// 必須項目の欠落や不正な形式（変更は一切行われない）
    #[error("{0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Unknown event '{0}'")]
    UnknownEvent(String),

    /// 送信者が未登録、またはクラスルームに参加していない
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Vote(#[from] VoteError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Failed to join: {0}")]
    JoinFailed(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl CoordinatorError {
    pub fn missing_fields() -> Self {
        CoordinatorError::Validation(MISSING_REQUIRED_FIELDS.to_string())
    }

    pub fn teacher_only() -> Self {
        CoordinatorError::Unauthorized("teacher role required".to_string())
    }

    pub fn reserved_room_id() -> Self {
        CoordinatorError::Validation(format!(
            "Room ids starting with '{}' are reserved",
            RoomId::SESSION_PREFIX
        ))
    }

    /// Machine-readable code sent in the ack
    pub fn code(&self) -> &'static str {
        match self {
            CoordinatorError::Validation(_) => "ValidationError",
            CoordinatorError::Unauthorized(_) => "Unauthorized",
            CoordinatorError::UnknownEvent(_) => "UnknownEvent",
            CoordinatorError::UserNotFound(_) => "UserNotFound",
            CoordinatorError::Registry(e) => match e {
                RegistryError::ConnectionNotFound(_) => "ConnectionNotFound",
                RegistryError::RoomNotFound(_) => "RoomNotFound",
                RegistryError::RoomAlreadyExists(_) => "RoomAlreadyExists",
                RegistryError::RoomKindMismatch { .. } => "ValidationError",
            },
            CoordinatorError::Vote(e) => match e {
                VoteError::TooManyOptions { .. } => "TooManyOptions",
                VoteError::NotEnoughOptions { .. } => "ValidationError",
                VoteError::VoteAlreadyActive => "VoteAlreadyActive",
                VoteError::VoteNotFound => "VoteNotFound",
                VoteError::VoteEnded => "VoteEnded",
                VoteError::InvalidOption(_) => "InvalidOption",
            },
            CoordinatorError::Session(e) => match e {
                SessionError::SessionAlreadyActive(_) => "SessionAlreadyActive",
                SessionError::SessionNotFound => "SessionNotFound",
            },
            CoordinatorError::JoinFailed(_) => "JoinFailed",
            CoordinatorError::Transport(_) => "TransportError",
        }
    }
}

impl From<ValueObjectError> for CoordinatorError {
    fn from(e: ValueObjectError) -> Self {
        match e {
            ValueObjectError::Empty(_) => CoordinatorError::missing_fields(),
            other => CoordinatorError::Validation(other.to_string()),
        }
    }
}
