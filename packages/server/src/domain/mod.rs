//! ドメイン層
//!
//! エンティティ・値オブジェクト・ドメインエラーと、
//! Infrastructure 層が実装するインターフェース（Repository / MessagePusher / Hooks）。

pub mod entity;
pub mod error;
pub mod hooks;
pub mod message_pusher;
pub mod repository;
pub mod value_object;

pub use entity::{
    ChatMessage, Connection, DEFAULT_MAX_VOTE_OPTIONS, DEFAULT_MESSAGE_LOG_CAPACITY,
    MAX_VOTE_OPTIONS, MIN_VOTE_OPTIONS, MessageKind, MessageLog, PresenceStatus, Room,
    TeachingSession, UserSession, VoteOption, VoteSession,
};
pub use error::{
    MessagePushError, RegistryError, SessionError, ValueObjectError, VoteError,
};
pub use hooks::{ClassroomHooks, NoopHooks};
pub use message_pusher::{BroadcastReport, MessagePusher, PusherChannel};
pub use repository::{
    AffectedRoom, ConnectionRegistry, LeaveOutcome, MemberPresence, RoomStateRepository,
    TeardownOutcome,
};
pub use value_object::{
    ConnectionId, DisplayName, MessageContent, RoomId, RoomKind, SessionId, Timestamp, UserId,
    UserRole,
};

#[cfg(test)]
pub use hooks::MockClassroomHooks;
#[cfg(test)]
pub use repository::MockConnectionRegistry;
