//! UseCase: プレゼンスステータスと在室状況の照会

use std::sync::Arc;

use serde::Serialize;

use crate::domain::{
    ConnectionId, ConnectionRegistry, PresenceStatus, RegistryError, RoomId,
};
use crate::infrastructure::dto::{
    conversion,
    websocket::{PresenceDto, ServerEvent, StatusUpdatedDto},
};

use super::error::CoordinatorError;
use super::fanout::Fanout;
use super::guard::require_registered;

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatusRequest {
    pub status: String,
    pub activity: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomPresence {
    pub room_id: String,
    pub count: usize,
    pub members: Vec<PresenceDto>,
}

pub struct StatusUseCase {
    registry: Arc<dyn ConnectionRegistry>,
    fanout: Arc<Fanout>,
}

impl StatusUseCase {
    pub fn new(registry: Arc<dyn ConnectionRegistry>, fanout: Arc<Fanout>) -> Self {
        Self { registry, fanout }
    }

    /// ステータスを記録し、自分のクラスルームに通知する
    pub async fn update_status(
        &self,
        connection_id: &ConnectionId,
        request: UpdateStatusRequest,
    ) -> Result<StatusUpdatedDto, CoordinatorError> {
        let now = self.fanout.now();
        let status = PresenceStatus {
            status: request.status,
            activity: request.activity,
            updated_at: now,
        };
        let session = self
            .registry
            .set_status(connection_id, status.clone())
            .await
            .map_err(|e| match e {
                RegistryError::ConnectionNotFound(id) => CoordinatorError::UserNotFound(id),
                other => other.into(),
            })?;

        let dto = StatusUpdatedDto {
            user_id: session.user_id.as_str().to_string(),
            user_name: session.display_name.as_str().to_string(),
            status: status.status,
            activity: status.activity,
            timestamp: now.value(),
        };
        self.fanout
            .to_room(
                &session.classroom_id,
                &ServerEvent::StatusUpdated(dto.clone()),
                Some(connection_id),
            )
            .await;
        Ok(dto)
    }

    /// ルームのメンバーとロール・ステータス
    pub async fn room_presence(
        &self,
        connection_id: &ConnectionId,
        room_id: RoomId,
    ) -> Result<RoomPresence, CoordinatorError> {
        require_registered(self.registry.as_ref(), connection_id).await?;
        let members = self
            .registry
            .room_presence(&room_id)
            .await
            .ok_or_else(|| RegistryError::RoomNotFound(room_id.to_string()))?;
        Ok(RoomPresence {
            room_id: room_id.into_string(),
            count: members.len(),
            members: members.iter().map(conversion::presence).collect(),
        })
    }
}
