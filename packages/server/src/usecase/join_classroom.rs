//! UseCase: クラスルームへの参加
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - JoinClassroomUseCase::execute() メソッド
//! - 登録 → クラスルーム参加 → セッションルーム参加 → student-joined 通知
//!
//! ### なぜこのテストが必要か
//! - 途中で失敗したときに部分的な変更が残らないこと（ロールバック）を保証
//! - 同じユーザーの再接続で古い接続が置き換えられることを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：参加と他メンバーへの通知、セッションルームへの同時参加
//! - 異常系：Registry の失敗（JoinFailed とロールバック）、クラスルームではない id への参加
//! - エッジケース：同じユーザーの別接続からの参加、置き換え後の参加失敗

use std::sync::Arc;

use serde::Serialize;

use crate::domain::{
    ConnectionId, ConnectionRegistry, DisplayName, RegistryError, RoomId, RoomKind, SessionId,
    Timestamp, UserId, UserRole, UserSession,
};
use crate::infrastructure::dto::websocket::{ServerEvent, StudentJoinedDto};

use super::error::CoordinatorError;
use super::fanout::Fanout;

/// 古い接続に通知する切断理由
pub const SESSION_REPLACED: &str = "session-replaced";

#[derive(Debug, Clone, PartialEq)]
pub struct JoinClassroomRequest {
    pub classroom_id: RoomId,
    pub user_id: UserId,
    pub user_name: DisplayName,
    pub role: UserRole,
    pub session_id: Option<SessionId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinClassroomResponse {
    pub classroom_id: String,
    pub total_students: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// クラスルーム参加のユースケース
pub struct JoinClassroomUseCase {
    registry: Arc<dyn ConnectionRegistry>,
    fanout: Arc<Fanout>,
}

impl JoinClassroomUseCase {
    pub fn new(registry: Arc<dyn ConnectionRegistry>, fanout: Arc<Fanout>) -> Self {
        Self { registry, fanout }
    }

    /// クラスルーム参加を実行
    ///
    /// # Returns
    ///
    /// * `Ok(JoinClassroomResponse)` - 参加後のクラスルームの人数
    /// * `Err(CoordinatorError::Validation)` - クラスルームとして参加できない id
    /// * `Err(CoordinatorError::JoinFailed)` - Registry の失敗（この呼び出しでの変更は取り消される）
    pub async fn execute(
        &self,
        connection_id: &ConnectionId,
        request: JoinClassroomRequest,
    ) -> Result<JoinClassroomResponse, CoordinatorError> {
        self.check_classroom(&request.classroom_id).await?;
        let now = self.fanout.now();
        let created_binding = self.registry.session_of(connection_id).await.is_none();

        // 1. 接続にユーザーを紐付ける
        let session = UserSession::new(
            request.user_id.clone(),
            request.user_name.clone(),
            request.role,
            request.classroom_id.clone(),
            request.session_id.clone(),
        );
        let superseded = self
            .registry
            .register(connection_id, session)
            .await
            .map_err(|e| CoordinatorError::JoinFailed(e.to_string()))?;

        // 2. クラスルーム（とセッションルーム）に参加
        let mut joined = Vec::new();
        let entered = self
            .enter_rooms(connection_id, &request, now, &mut joined)
            .await;

        // 置き換えられた接続は register の時点で Registry から外れている
        if let Some(old) = &superseded {
            tracing::info!(
                "User '{}' reconnected, replacing connection '{}' with '{}'",
                request.user_id,
                old,
                connection_id
            );
            self.fanout.close(old, SESSION_REPLACED).await;
        }

        let total = match entered {
            Ok(total) => total,
            Err(e) => {
                tracing::warn!(
                    "Join of '{}' to '{}' failed, rolling back: {}",
                    request.user_id,
                    request.classroom_id,
                    e
                );
                // 引き継いだ紐付けとメンバーシップは残す
                let release = created_binding && superseded.is_none();
                self.rollback(connection_id, &joined, release).await;
                return Err(CoordinatorError::JoinFailed(e.to_string()));
            }
        };

        // 3. 他のメンバーに通知
        let event = ServerEvent::StudentJoined(StudentJoinedDto {
            classroom_id: request.classroom_id.as_str().to_string(),
            user_id: request.user_id.as_str().to_string(),
            user_name: request.user_name.as_str().to_string(),
            user_type: request.role.as_str().to_string(),
            total_students: total,
            timestamp: now.value(),
        });
        self.fanout
            .to_room(&request.classroom_id, &event, Some(connection_id))
            .await;

        tracing::info!(
            "User '{}' ({}) joined classroom '{}' ({} member(s))",
            request.user_id,
            request.role.as_str(),
            request.classroom_id,
            total
        );

        Ok(JoinClassroomResponse {
            classroom_id: request.classroom_id.into_string(),
            total_students: total,
            session_id: request.session_id.map(|s| s.as_str().to_string()),
        })
    }

    /// 予約済みの id や、クラスルーム以外の既存ルームへの参加は何も変更せずに拒否する
    async fn check_classroom(&self, classroom_id: &RoomId) -> Result<(), CoordinatorError> {
        if classroom_id.is_session_room() {
            return Err(CoordinatorError::reserved_room_id());
        }
        if let Some(room) = self.registry.room(classroom_id).await
            && room.kind != RoomKind::Classroom
        {
            return Err(CoordinatorError::Validation(format!(
                "'{}' is not a classroom",
                classroom_id
            )));
        }
        Ok(())
    }

    /// 参加したルームを `joined` に記録しながら、クラスルームの人数を返す
    async fn enter_rooms(
        &self,
        connection_id: &ConnectionId,
        request: &JoinClassroomRequest,
        now: Timestamp,
        joined: &mut Vec<RoomId>,
    ) -> Result<usize, RegistryError> {
        let total = self
            .enter(
                connection_id,
                &request.classroom_id,
                RoomKind::Classroom,
                now,
                joined,
            )
            .await?;
        if let Some(session_id) = &request.session_id {
            let sub_room = RoomId::for_session(session_id);
            self.enter(connection_id, &sub_room, RoomKind::Session, now, joined)
                .await?;
        }
        Ok(total)
    }

    async fn enter(
        &self,
        connection_id: &ConnectionId,
        room_id: &RoomId,
        kind: RoomKind,
        now: Timestamp,
        joined: &mut Vec<RoomId>,
    ) -> Result<usize, RegistryError> {
        let was_member = self.registry.is_member(connection_id, room_id).await;
        let count = self
            .registry
            .join_room(connection_id, room_id, kind, now)
            .await?;
        if !was_member {
            joined.push(room_id.clone());
        }
        Ok(count)
    }

    async fn rollback(&self, connection_id: &ConnectionId, joined: &[RoomId], release: bool) {
        for room_id in joined.iter().rev() {
            if let Err(e) = self.registry.leave_room(connection_id, room_id).await {
                tracing::warn!("Rollback could not leave '{}': {}", room_id, e);
            }
        }
        if release {
            self.registry.unbind(connection_id).await;
        }
    }
}
