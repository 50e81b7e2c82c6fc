//! Collaborator hooks
//!
//! メッセージの永続化や回答の分析は外部のサービスが担当する。
//! コーディネーターは呼び出すだけで、結果を待って処理を変えることはない。

use async_trait::async_trait;

use super::{ChatMessage, RoomId};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClassroomHooks: Send + Sync {
    /// Called after a chat message was appended to a room's log
    async fn persist_message(&self, room_id: &RoomId, message: &ChatMessage);

    /// Called after an answer was appended to a room's log
    async fn analyze_answer(&self, room_id: &RoomId, message: &ChatMessage);
}

/// Hooks that do nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

#[async_trait]
impl ClassroomHooks for NoopHooks {
    async fn persist_message(&self, room_id: &RoomId, message: &ChatMessage) {
        tracing::trace!(
            "persist_message skipped for {} from '{}'",
            room_id,
            message.sender_id
        );
    }

    async fn analyze_answer(&self, room_id: &RoomId, message: &ChatMessage) {
        tracing::trace!(
            "analyze_answer skipped for {} from '{}'",
            room_id,
            message.sender_id
        );
    }
}
