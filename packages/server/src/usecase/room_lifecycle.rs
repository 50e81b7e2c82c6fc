//! UseCase: ブレイクアウトルームの作成・参加・退出・更新・削除
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - RoomLifecycleUseCase の create / join / leave / update / delete
//!
//! ### なぜこのテストが必要か
//! - 更新・削除が作成者と教師に限られることを保証
//! - 削除で全メンバーが強制退出し、ルームの状態も破棄されることを保証
//! - クラスルーム・セッションルームがこの API で変更されないことを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：作成者の自動参加、参加・退出の通知、更新・削除の通知
//! - 異常系：ID の重複、存在しないルーム、権限の無い更新、クラスルームの削除、作成者の参加失敗

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::{
    ConnectionId, ConnectionRegistry, RegistryError, Room, RoomId, RoomKind, RoomStateRepository,
    UserSession,
};
use crate::infrastructure::dto::{
    conversion,
    websocket::{RoomDeletedDto, RoomDto, RoomMemberDto, ServerEvent},
};

use super::error::CoordinatorError;
use super::fanout::Fanout;
use super::guard::require_registered;

#[derive(Debug, Clone, PartialEq)]
pub struct CreateRoomRequest {
    pub room_id: Option<RoomId>,
    pub name: Option<String>,
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRoomRequest {
    pub room_id: RoomId,
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMembership {
    pub room_id: String,
    pub member_count: usize,
    /// `leave-room` only: whether the user was a member
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDeleted {
    pub room_id: String,
    pub evicted: usize,
}

/// ブレイクアウトルームのユースケース
pub struct RoomLifecycleUseCase {
    registry: Arc<dyn ConnectionRegistry>,
    room_state: Arc<dyn RoomStateRepository>,
    fanout: Arc<Fanout>,
}

impl RoomLifecycleUseCase {
    pub fn new(
        registry: Arc<dyn ConnectionRegistry>,
        room_state: Arc<dyn RoomStateRepository>,
        fanout: Arc<Fanout>,
    ) -> Self {
        Self {
            registry,
            room_state,
            fanout,
        }
    }

    /// ルームを作成し、作成者を参加させる
    pub async fn create(
        &self,
        connection_id: &ConnectionId,
        request: CreateRoomRequest,
    ) -> Result<RoomDto, CoordinatorError> {
        let creator = require_registered(self.registry.as_ref(), connection_id).await?;
        let room_id = request.room_id.unwrap_or_else(RoomId::generate_breakout);
        if room_id.is_session_room() {
            return Err(CoordinatorError::reserved_room_id());
        }

        let mut metadata = request.metadata;
        if let Some(name) = request.name {
            metadata.insert("name".to_string(), Value::String(name));
        }
        let mut room = Room::new(room_id.clone(), RoomKind::Breakout, self.fanout.now());
        room.metadata = Value::Object(metadata);
        room.created_by = Some(creator.user_id.clone());

        self.registry.create_room(room).await?;
        if let Err(e) = self
            .registry
            .join_existing_room(connection_id, &room_id)
            .await
        {
            // 作成者が参加できなかったルームは残さない
            if let Err(cleanup) = self.registry.delete_room(&room_id).await {
                tracing::warn!("Could not remove room '{}': {}", room_id, cleanup);
            }
            return Err(e.into());
        }
        let dto = self.snapshot(&room_id).await?;

        self.fanout
            .to_room(
                &creator.classroom_id,
                &ServerEvent::RoomCreated(dto.clone()),
                Some(connection_id),
            )
            .await;
        tracing::info!("Room '{}' created by '{}'", room_id, creator.user_id);
        Ok(dto)
    }

    pub async fn join(
        &self,
        connection_id: &ConnectionId,
        room_id: RoomId,
    ) -> Result<RoomMembership, CoordinatorError> {
        let member = require_registered(self.registry.as_ref(), connection_id).await?;
        self.breakout(&room_id).await?;

        let count = self
            .registry
            .join_existing_room(connection_id, &room_id)
            .await?;
        let event = ServerEvent::RoomMemberJoined(self.member_event(&room_id, &member, count));
        self.fanout
            .to_room(&room_id, &event, Some(connection_id))
            .await;

        Ok(RoomMembership {
            room_id: room_id.into_string(),
            member_count: count,
            left: None,
        })
    }

    pub async fn leave(
        &self,
        connection_id: &ConnectionId,
        room_id: RoomId,
    ) -> Result<RoomMembership, CoordinatorError> {
        let member = require_registered(self.registry.as_ref(), connection_id).await?;
        self.breakout(&room_id).await?;

        let outcome = self.registry.leave_room(connection_id, &room_id).await?;
        if outcome.was_member {
            let event = ServerEvent::RoomMemberLeft(self.member_event(
                &room_id,
                &member,
                outcome.member_count,
            ));
            self.fanout.to_room(&room_id, &event, None).await;
        }
        self.fanout.discard_if_removed(&room_id).await;

        Ok(RoomMembership {
            room_id: room_id.into_string(),
            member_count: outcome.member_count,
            left: Some(outcome.was_member),
        })
    }

    /// メタデータを置き換える（作成者または教師のみ）
    pub async fn update(
        &self,
        connection_id: &ConnectionId,
        request: UpdateRoomRequest,
    ) -> Result<RoomDto, CoordinatorError> {
        self.require_editor(connection_id, &request.room_id).await?;

        let room = self
            .registry
            .update_room_metadata(&request.room_id, Value::Object(request.metadata))
            .await?;
        let dto = conversion::room(&room);
        self.fanout
            .to_room(&request.room_id, &ServerEvent::RoomUpdated(dto.clone()), None)
            .await;
        Ok(dto)
    }

    /// 全メンバーに通知してからルームを削除する（作成者または教師のみ）
    pub async fn delete(
        &self,
        connection_id: &ConnectionId,
        room_id: RoomId,
    ) -> Result<RoomDeleted, CoordinatorError> {
        let editor = self.require_editor(connection_id, &room_id).await?;

        let event = ServerEvent::RoomDeleted(RoomDeletedDto {
            room_id: room_id.as_str().to_string(),
            deleted_by: editor.user_id.as_str().to_string(),
            timestamp: self.fanout.now().value(),
        });
        self.fanout.to_room(&room_id, &event, None).await;

        let evicted = self.registry.delete_room(&room_id).await?;
        self.room_state.discard(&room_id).await;
        tracing::info!(
            "Room '{}' deleted by '{}' ({} member(s) evicted)",
            room_id,
            editor.user_id,
            evicted.len()
        );

        Ok(RoomDeleted {
            room_id: room_id.into_string(),
            evicted: evicted.len(),
        })
    }

    /// ブレイクアウトルームであること（クラスルームとセッションルームはこの API の対象外）
    async fn breakout(&self, room_id: &RoomId) -> Result<Room, CoordinatorError> {
        let room = self
            .registry
            .room(room_id)
            .await
            .ok_or_else(|| RegistryError::RoomNotFound(room_id.to_string()))?;
        if room.kind != RoomKind::Breakout {
            return Err(CoordinatorError::Validation(format!(
                "Room '{}' is a {} room and cannot be managed here",
                room_id,
                conversion::room_kind_str(room.kind)
            )));
        }
        Ok(room)
    }

    async fn require_editor(
        &self,
        connection_id: &ConnectionId,
        room_id: &RoomId,
    ) -> Result<UserSession, CoordinatorError> {
        let session = require_registered(self.registry.as_ref(), connection_id).await?;
        let room = self.breakout(room_id).await?;
        let is_creator = room.created_by.as_ref() == Some(&session.user_id);
        if !is_creator && !session.role.is_teacher() {
            return Err(CoordinatorError::Unauthorized(format!(
                "only the creator or a teacher can change room '{}'",
                room_id
            )));
        }
        Ok(session)
    }

    async fn snapshot(&self, room_id: &RoomId) -> Result<RoomDto, CoordinatorError> {
        self.registry
            .room(room_id)
            .await
            .map(|room| conversion::room(&room))
            .ok_or_else(|| RegistryError::RoomNotFound(room_id.to_string()).into())
    }

    fn member_event(&self, room_id: &RoomId, member: &UserSession, count: usize) -> RoomMemberDto {
        RoomMemberDto {
            room_id: room_id.as_str().to_string(),
            user_id: member.user_id.as_str().to_string(),
            user_name: member.display_name.as_str().to_string(),
            member_count: count,
            timestamp: self.fanout.now().value(),
        }
    }
}
