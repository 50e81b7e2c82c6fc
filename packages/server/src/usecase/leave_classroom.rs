//! UseCase: クラスルームからの退出
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - LeaveClassroomUseCase::execute() メソッド
//!
//! ### なぜこのテストが必要か
//! - 退出後の人数が残りのメンバーに通知されることを保証
//! - 参加していないクラスルームからの退出が何も変更しないことを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：退出と通知（セッションルームからも抜ける、最後の 1 人が抜けたセッションルームの状態の破棄）
//! - エッジケース：参加していない接続からの退出（left = false、通知なし）

use std::sync::Arc;

use serde::Serialize;

use crate::domain::{ConnectionId, ConnectionRegistry, RoomId, UserId, UserRole};

use super::error::CoordinatorError;
use super::fanout::{DepartureReason, Fanout, student_left};

#[derive(Debug, Clone, PartialEq)]
pub struct LeaveClassroomRequest {
    pub classroom_id: RoomId,
    pub user_id: UserId,
    pub role: UserRole,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveClassroomResponse {
    pub classroom_id: String,
    pub total_students: usize,
    /// `false` when the connection was not a member (nothing changed)
    pub left: bool,
}

/// クラスルーム退出のユースケース
pub struct LeaveClassroomUseCase {
    registry: Arc<dyn ConnectionRegistry>,
    fanout: Arc<Fanout>,
}

impl LeaveClassroomUseCase {
    pub fn new(registry: Arc<dyn ConnectionRegistry>, fanout: Arc<Fanout>) -> Self {
        Self { registry, fanout }
    }

    pub async fn execute(
        &self,
        connection_id: &ConnectionId,
        request: LeaveClassroomRequest,
    ) -> Result<LeaveClassroomResponse, CoordinatorError> {
        let session = self
            .registry
            .session_of(connection_id)
            .await
            .filter(|s| s.user_id == request.user_id);
        let member = match &session {
            Some(_) => {
                self.registry
                    .is_member(connection_id, &request.classroom_id)
                    .await
            }
            None => false,
        };

        let Some(session) = session.filter(|_| member) else {
            let total = self
                .registry
                .room_member_count(&request.classroom_id)
                .await
                .unwrap_or(0);
            tracing::debug!(
                "'{}' is not in classroom '{}', nothing to leave",
                request.user_id,
                request.classroom_id
            );
            return Ok(LeaveClassroomResponse {
                classroom_id: request.classroom_id.into_string(),
                total_students: total,
                left: false,
            });
        };

        let now = self.fanout.now();

        // 1. セッションルームから退出
        if let Some(session_id) = &session.session_id {
            let sub_room = RoomId::for_session(session_id);
            let outcome = self.registry.leave_room(connection_id, &sub_room).await?;
            if outcome.was_member {
                let event = student_left(
                    &session,
                    &sub_room,
                    outcome.member_count,
                    DepartureReason::Leave,
                    now,
                );
                self.fanout.to_room(&sub_room, &event, None).await;
            }
            self.fanout.discard_if_removed(&sub_room).await;
            self.registry
                .set_current_session(connection_id, None)
                .await?;
        }

        // 2. クラスルームから退出
        let outcome = self
            .registry
            .leave_room(connection_id, &request.classroom_id)
            .await?;
        let event = student_left(
            &session,
            &request.classroom_id,
            outcome.member_count,
            DepartureReason::Leave,
            now,
        );
        self.fanout
            .to_room(&request.classroom_id, &event, None)
            .await;

        tracing::info!(
            "User '{}' left classroom '{}' ({} member(s) remain)",
            request.user_id,
            request.classroom_id,
            outcome.member_count
        );

        Ok(LeaveClassroomResponse {
            classroom_id: request.classroom_id.into_string(),
            total_students: outcome.member_count,
            left: true,
        })
    }
}
