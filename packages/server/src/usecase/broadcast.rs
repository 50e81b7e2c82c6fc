//! UseCase: 教師による任意イベントの一斉配信
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - BroadcastUseCase::execute() と 4 種類の宛先指定
//!
//! ### なぜこのテストが必要か
//! - ack の `delivered` が実際に送信を受け付けた接続の数であることを保証
//! - 複数の宛先に属する接続にも 1 回しか届かないことを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：全体・クラスルーム・ユーザー・セッション宛て
//! - 異常系：生徒からの配信
//! - エッジケース：接続していないユーザー宛て（delivered = 0）

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::domain::{ConnectionId, ConnectionRegistry, RoomId, SessionId, UserId};
use crate::infrastructure::dto::websocket::{BroadcastDto, ServerEvent};

use super::error::CoordinatorError;
use super::fanout::Fanout;
use super::guard::require_teacher;

#[derive(Debug, Clone, PartialEq)]
pub enum BroadcastTarget {
    All,
    Classrooms(Vec<RoomId>),
    Users(Vec<UserId>),
    Sessions(Vec<SessionId>),
}

impl BroadcastTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            BroadcastTarget::All => "all",
            BroadcastTarget::Classrooms(_) => "classrooms",
            BroadcastTarget::Users(_) => "users",
            BroadcastTarget::Sessions(_) => "sessions",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BroadcastRequest {
    pub target: BroadcastTarget,
    pub event: String,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastResponse {
    pub target: String,
    pub delivered: usize,
}

pub struct BroadcastUseCase {
    registry: Arc<dyn ConnectionRegistry>,
    fanout: Arc<Fanout>,
}

impl BroadcastUseCase {
    pub fn new(registry: Arc<dyn ConnectionRegistry>, fanout: Arc<Fanout>) -> Self {
        Self { registry, fanout }
    }

    pub async fn execute(
        &self,
        connection_id: &ConnectionId,
        request: BroadcastRequest,
    ) -> Result<BroadcastResponse, CoordinatorError> {
        let sender = require_teacher(self.registry.as_ref(), connection_id).await?;
        let event = ServerEvent::Broadcast(BroadcastDto {
            event: request.event,
            data: request.data,
            sender_id: sender.user_id.as_str().to_string(),
            timestamp: self.fanout.now().value(),
        });

        let delivered = match &request.target {
            BroadcastTarget::All => self.fanout.to_all(&event).await,
            BroadcastTarget::Classrooms(rooms) => self.fanout.to_rooms(rooms, &event).await,
            BroadcastTarget::Sessions(sessions) => {
                let rooms: Vec<RoomId> = sessions.iter().map(RoomId::for_session).collect();
                self.fanout.to_rooms(&rooms, &event).await
            }
            BroadcastTarget::Users(users) => {
                let mut targets = BTreeSet::new();
                for user_id in users {
                    match self.registry.connection_of(user_id).await {
                        Some(connection) => {
                            targets.insert(connection);
                        }
                        None => tracing::debug!("Broadcast target '{}' is not connected", user_id),
                    }
                }
                self.fanout
                    .to_connections(targets.into_iter().collect(), &event)
                    .await
            }
        };

        tracing::info!(
            "'{}' broadcast to {} ({} delivered)",
            sender.user_id,
            request.target.as_str(),
            delivered
        );
        Ok(BroadcastResponse {
            target: request.target.as_str().to_string(),
            delivered,
        })
    }
}
