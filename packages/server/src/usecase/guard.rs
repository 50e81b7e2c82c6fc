//! UseCase 共通: 送信者の確認
//!
//! ロールは join-classroom のペイロードで申告されたものをそのまま信頼する。

use crate::domain::{ConnectionId, ConnectionRegistry, RoomId, UserSession};

use super::error::CoordinatorError;

/// 参加済み（ユーザーが紐付いている）接続であること
pub async fn require_registered(
    registry: &dyn ConnectionRegistry,
    connection_id: &ConnectionId,
) -> Result<UserSession, CoordinatorError> {
    registry
        .session_of(connection_id)
        .await
        .ok_or_else(|| CoordinatorError::UserNotFound(connection_id.to_string()))
}

/// 参加済みかつ指定したルームのメンバーであること
pub async fn require_member(
    registry: &dyn ConnectionRegistry,
    connection_id: &ConnectionId,
    room_id: &RoomId,
) -> Result<UserSession, CoordinatorError> {
    let session = require_registered(registry, connection_id).await?;
    if !registry.is_member(connection_id, room_id).await {
        return Err(CoordinatorError::UserNotFound(format!(
            "{} is not in room {}",
            session.user_id, room_id
        )));
    }
    Ok(session)
}

/// クラスルームのメンバーであり、配信先のルーム（セッションルーム等）にも参加していること
pub async fn require_member_of_target(
    registry: &dyn ConnectionRegistry,
    connection_id: &ConnectionId,
    classroom_id: &RoomId,
    target_room: &RoomId,
) -> Result<UserSession, CoordinatorError> {
    let session = require_member(registry, connection_id, classroom_id).await?;
    if target_room != classroom_id {
        require_member(registry, connection_id, target_room).await?;
    }
    Ok(session)
}

/// 教師として参加している接続であること
pub async fn require_teacher(
    registry: &dyn ConnectionRegistry,
    connection_id: &ConnectionId,
) -> Result<UserSession, CoordinatorError> {
    match registry.session_of(connection_id).await {
        Some(session) if session.role.is_teacher() => Ok(session),
        _ => Err(CoordinatorError::teacher_only()),
    }
}

/// 教師であり、かつ操作対象のルームに参加していること
pub async fn require_teacher_of(
    registry: &dyn ConnectionRegistry,
    connection_id: &ConnectionId,
    room_id: &RoomId,
) -> Result<UserSession, CoordinatorError> {
    require_teacher(registry, connection_id).await?;
    require_member(registry, connection_id, room_id).await
}
