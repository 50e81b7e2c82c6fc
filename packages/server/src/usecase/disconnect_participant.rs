//! UseCase: 切断処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisconnectParticipantUseCase::execute() メソッド
//!
//! ### なぜこのテストが必要か
//! - 切断時に参加していた全てのルームに student-left が届くことを保証
//! - 受信ループの終了とタイムアウトなど、切断が複数の経路から起きても二重に処理されない
//!
//! ### どのような状況を想定しているか
//! - 正常系：参加済みの接続の切断
//! - エッジケース：未参加の接続の切断（通知なし）、既に片付け済みの接続の切断

use std::sync::Arc;

use crate::domain::{ConnectionId, TeardownOutcome};

use super::fanout::{DepartureReason, Fanout};

/// 切断のユースケース
pub struct DisconnectParticipantUseCase {
    fanout: Arc<Fanout>,
}

impl DisconnectParticipantUseCase {
    pub fn new(fanout: Arc<Fanout>) -> Self {
        Self { fanout }
    }

    /// 接続を片付けて退出を通知する。既に片付け済みなら `None`
    pub async fn execute(&self, connection_id: &ConnectionId) -> Option<TeardownOutcome> {
        let outcome = self
            .fanout
            .depart(connection_id, DepartureReason::Disconnect)
            .await;
        match &outcome {
            Some(o) => tracing::info!(
                "Connection '{}' disconnected ({} room(s) left)",
                connection_id,
                o.rooms.len()
            ),
            None => tracing::debug!("Connection '{}' was already torn down", connection_id),
        }
        outcome
    }
}
