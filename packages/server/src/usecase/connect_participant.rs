//! UseCase: 接続の受け付けとアクティビティ
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectParticipantUseCase::execute() / touch() / heartbeat()
//!
//! ### なぜこのテストが必要か
//! - ハンドシェイク直後の接続は未参加のまま Registry と MessagePusher の両方に載る
//! - heartbeat がタイムアウト判定の基準となる最終アクティビティを更新することを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：接続の登録、heartbeat の応答
//! - エッジケース：既に閉じた接続への touch（何も起きない）

use std::sync::Arc;

use serde::Serialize;

use crate::domain::{ConnectionId, ConnectionRegistry, MessagePusher, PusherChannel, Timestamp};
use crate::infrastructure::dto::websocket::{HeartbeatDto, ServerEvent};

use super::fanout::Fanout;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatResponse {
    pub timestamp: i64,
}

/// 接続受け付けのユースケース
pub struct ConnectParticipantUseCase {
    registry: Arc<dyn ConnectionRegistry>,
    message_pusher: Arc<dyn MessagePusher>,
    fanout: Arc<Fanout>,
}

impl ConnectParticipantUseCase {
    pub fn new(
        registry: Arc<dyn ConnectionRegistry>,
        message_pusher: Arc<dyn MessagePusher>,
        fanout: Arc<Fanout>,
    ) -> Self {
        Self {
            registry,
            message_pusher,
            fanout,
        }
    }

    /// ハンドシェイク完了時に呼ぶ。接続は未参加（ユーザー未紐付け）の状態で登録される
    ///
    /// # Returns
    ///
    /// 接続時刻
    pub async fn execute(&self, connection_id: ConnectionId, sender: PusherChannel) -> Timestamp {
        let connected_at = self.fanout.now();
        self.registry
            .open(connection_id.clone(), connected_at)
            .await;
        self.message_pusher
            .register_client(connection_id, sender)
            .await;
        connected_at
    }

    /// 受信したフレームごとに最終アクティビティを更新する
    pub async fn touch(&self, connection_id: &ConnectionId) {
        self.registry.touch(connection_id, self.fanout.now()).await;
    }

    /// `heartbeat` に応答する
    pub async fn heartbeat(&self, connection_id: &ConnectionId) -> HeartbeatResponse {
        let timestamp = self.fanout.now().value();
        self.fanout
            .to_connection(
                connection_id,
                &ServerEvent::Heartbeat(HeartbeatDto { timestamp }),
            )
            .await;
        HeartbeatResponse { timestamp }
    }

    /// ack フレームを送信元の接続へ返す
    pub async fn push_ack(&self, connection_id: &ConnectionId, frame: &str) {
        if !self.fanout.push_frame(connection_id, frame).await {
            tracing::debug!("Ack to '{}' was not delivered", connection_id);
        }
    }
}
