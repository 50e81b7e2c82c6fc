//! UseCase: 教師による授業の操作
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - TeacherControlUseCase の start_session / end_session / change_level
//!
//! ### なぜこのテストが必要か
//! - 教師以外からの操作が何も変更せずに拒否されることを保証
//! - クラスルームごとにアクティブな授業セッションが高々 1 つであることを保証
//! - 授業セッションの終了で進行中の投票も終了することを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：開始・終了・難易度の変更とクラスルーム全体への通知
//! - 異常系：生徒からの操作、二重の開始、アクティブでないセッションの終了

use std::sync::Arc;

use serde::Serialize;

use crate::domain::{
    ConnectionId, ConnectionRegistry, RoomId, RoomKind, RoomStateRepository, SessionId,
};
use crate::infrastructure::dto::{
    conversion,
    websocket::{LevelChangedDto, ServerEvent, SessionEndedDto, SessionStartedDto},
};

use super::error::CoordinatorError;
use super::fanout::Fanout;
use super::guard::require_teacher_of;

/// `sessionName` が省略されたときの名前
pub const DEFAULT_SESSION_NAME: &str = "Untitled session";

#[derive(Debug, Clone, PartialEq)]
pub struct StartSessionRequest {
    pub classroom_id: RoomId,
    pub session_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EndSessionRequest {
    pub classroom_id: RoomId,
    pub session_id: Option<SessionId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChangeLevelRequest {
    pub classroom_id: RoomId,
    pub level: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStartedResponse {
    pub session_id: String,
    pub session_name: String,
    pub started_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEndedResponse {
    pub session_id: String,
    pub started_at: i64,
    pub ended_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelChangedResponse {
    pub classroom_id: String,
    pub level: String,
    pub previous_level: Option<String>,
}

/// 授業操作のユースケース（教師のみ）
pub struct TeacherControlUseCase {
    registry: Arc<dyn ConnectionRegistry>,
    room_state: Arc<dyn RoomStateRepository>,
    fanout: Arc<Fanout>,
}

impl TeacherControlUseCase {
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

    /// 授業セッションを開始し、教師をセッションルームに参加させる
    pub async fn start_session(
        &self,
        connection_id: &ConnectionId,
        request: StartSessionRequest,
    ) -> Result<SessionStartedResponse, CoordinatorError> {
        let teacher =
            require_teacher_of(self.registry.as_ref(), connection_id, &request.classroom_id)
                .await?;
        let now = self.fanout.now();
        let name = request
            .session_name
            .unwrap_or_else(|| DEFAULT_SESSION_NAME.to_string());

        let session = self
            .room_state
            .start_session(&request.classroom_id, name, teacher.user_id.clone(), now)
            .await?;

        let sub_room = RoomId::for_session(&session.id);
        if let Err(e) = self
            .registry
            .join_room(connection_id, &sub_room, RoomKind::Session, now)
            .await
        {
            // 教師が参加できなかったセッションは残さない
            if let Err(rollback) = self
                .room_state
                .end_session(&request.classroom_id, Some(&session.id), now)
                .await
            {
                tracing::warn!("Could not roll back session '{}': {}", session.id, rollback);
            }
            return Err(CoordinatorError::JoinFailed(e.to_string()));
        }
        self.registry
            .set_current_session(connection_id, Some(session.id.clone()))
            .await?;

        let event = ServerEvent::SessionStarted(SessionStartedDto {
            classroom_id: request.classroom_id.as_str().to_string(),
            session_id: session.id.as_str().to_string(),
            session_name: session.name.clone(),
            teacher_id: teacher.user_id.as_str().to_string(),
            started_at: session.started_at.value(),
        });
        self.fanout
            .to_room(&request.classroom_id, &event, None)
            .await;

        tracing::info!(
            "Session '{}' ({}) started in '{}' by '{}'",
            session.id,
            session.name,
            request.classroom_id,
            teacher.user_id
        );

        Ok(SessionStartedResponse {
            session_id: session.id.as_str().to_string(),
            session_name: session.name,
            started_at: session.started_at.value(),
        })
    }

    /// アクティブな授業セッションを終了する。進行中の投票も終了する
    pub async fn end_session(
        &self,
        connection_id: &ConnectionId,
        request: EndSessionRequest,
    ) -> Result<SessionEndedResponse, CoordinatorError> {
        require_teacher_of(self.registry.as_ref(), connection_id, &request.classroom_id).await?;
        let now = self.fanout.now();

        let session = self
            .room_state
            .end_session(&request.classroom_id, request.session_id.as_ref(), now)
            .await?;
        let ended_at = session.ended_at.unwrap_or(now);

        let sub_room = RoomId::for_session(&session.id);
        if let Some(vote) = self
            .room_state
            .current_vote(&sub_room)
            .await
            .filter(|v| v.active)
        {
            match self.room_state.end_vote(&sub_room, now).await {
                Ok(ended) => {
                    let event = ServerEvent::VoteEnded(conversion::vote_results(
                        &ended,
                        session.id.as_str(),
                    ));
                    self.fanout.to_room(&sub_room, &event, None).await;
                }
                Err(e) => tracing::debug!("Vote '{}' was already closed: {}", vote.id, e),
            }
        }

        let current = self.registry.session_of(connection_id).await;
        if current.and_then(|s| s.session_id).as_ref() == Some(&session.id) {
            self.registry
                .set_current_session(connection_id, None)
                .await?;
        }

        let event = ServerEvent::SessionEnded(SessionEndedDto {
            classroom_id: request.classroom_id.as_str().to_string(),
            session_id: session.id.as_str().to_string(),
            started_at: session.started_at.value(),
            ended_at: ended_at.value(),
        });
        self.fanout
            .to_room(&request.classroom_id, &event, None)
            .await;

        tracing::info!(
            "Session '{}' in '{}' ended",
            session.id,
            request.classroom_id
        );

        Ok(SessionEndedResponse {
            session_id: session.id.as_str().to_string(),
            started_at: session.started_at.value(),
            ended_at: ended_at.value(),
        })
    }

    /// 難易度を変更してクラスルームに通知する
    pub async fn change_level(
        &self,
        connection_id: &ConnectionId,
        request: ChangeLevelRequest,
    ) -> Result<LevelChangedResponse, CoordinatorError> {
        let teacher =
            require_teacher_of(self.registry.as_ref(), connection_id, &request.classroom_id)
                .await?;
        let previous = self
            .room_state
            .set_level(&request.classroom_id, request.level.clone())
            .await;

        let event = ServerEvent::LevelChanged(LevelChangedDto {
            classroom_id: request.classroom_id.as_str().to_string(),
            level: request.level.clone(),
            previous_level: previous.clone(),
            changed_by: teacher.user_id.as_str().to_string(),
            timestamp: self.fanout.now().value(),
        });
        self.fanout
            .to_room(&request.classroom_id, &event, None)
            .await;

        Ok(LevelChangedResponse {
            classroom_id: request.classroom_id.into_string(),
            level: request.level,
            previous_level: previous,
        })
    }
}
