//! UseCase: ルーム一覧・詳細の取得（HTTP API 用）

use std::sync::Arc;

use crate::domain::{ConnectionRegistry, MemberPresence, RegistryError, Room, RoomId};

use super::error::CoordinatorError;

pub struct RoomQueryUseCase {
    registry: Arc<dyn ConnectionRegistry>,
}

impl RoomQueryUseCase {
    pub fn new(registry: Arc<dyn ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// 全てのルーム（ID 順）
    pub async fn list(&self) -> Vec<Room> {
        self.registry.rooms().await
    }

    /// ルームとメンバーの在室状況
    pub async fn detail(
        &self,
        room_id: String,
    ) -> Result<(Room, Vec<MemberPresence>), CoordinatorError> {
        let room_id = RoomId::new(room_id)?;
        let not_found = || RegistryError::RoomNotFound(room_id.to_string());
        let room = self.registry.room(&room_id).await.ok_or_else(not_found)?;
        let members = self
            .registry
            .room_presence(&room_id)
            .await
            .ok_or_else(not_found)?;
        Ok((room, members))
    }
}
