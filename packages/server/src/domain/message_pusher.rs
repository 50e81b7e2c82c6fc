//! MessagePusher trait 定義
//!
//! クライアントへのフレーム送信（通知）を抽象化する。
//! UseCase 層はこの trait に依存し、WebSocket などの具体的な実装には依存しない。

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{ConnectionId, MessagePushError};

/// Outbound channel of one connection (serialized JSON frames)
pub type PusherChannel = mpsc::UnboundedSender<String>;

/// Outcome of a fan-out
///
/// `delivered` counts connections whose channel accepted the frame, not the
/// number of attempted targets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: Vec<ConnectionId>,
}

impl BroadcastReport {
    pub fn merge(&mut self, other: BroadcastReport) {
        self.delivered += other.delivered;
        self.failed.extend(other.failed);
    }
}

#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// 接続の送信チャンネルを登録
    async fn register_client(&self, connection_id: ConnectionId, sender: PusherChannel);

    /// 送信チャンネルを破棄（チャンネルが閉じるので送信タスクも終了する）
    async fn unregister_client(&self, connection_id: &ConnectionId);

    /// 単一の接続に送信
    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        content: &str,
    ) -> Result<(), MessagePushError>;

    /// 複数の接続に送信（一部の失敗は許容し、レポートで返す）
    async fn broadcast(&self, targets: Vec<ConnectionId>, content: &str) -> BroadcastReport;

    /// 登録済みの全ての接続 ID
    async fn connection_ids(&self) -> Vec<ConnectionId>;
}
