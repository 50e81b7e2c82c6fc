//! UseCase: 接続の生存監視
//!
//! 一定間隔でスイープし、タイムアウトを超えて無通信の接続を片付ける。
//! 判定はスイープ開始時のスナップショットで行い、実際の削除は Registry のロック内で
//! 最終アクティビティを再確認してから行う（スイープ中に届いたフレームで救済される）。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - LivenessMonitor::sweep() メソッド
//!
//! ### なぜこのテストが必要か
//! - タイムアウトした接続に disconnect が届き、ルームのメンバーに student-left が 1 回ずつ届くことを保証
//! - タイムアウトちょうどの接続や、判定後に通信した接続が削除されないことを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：無通信の接続の削除
//! - エッジケース：境界値、スナップショット取得後のアクティビティ

use std::sync::Arc;
use std::time::Duration;

use lectern_shared::time::Clock;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::domain::{ConnectionId, ConnectionRegistry, TeardownOutcome, Timestamp};

use super::fanout::Fanout;

pub struct LivenessMonitor {
    registry: Arc<dyn ConnectionRegistry>,
    fanout: Arc<Fanout>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    timeout: Duration,
}

impl LivenessMonitor {
    pub fn new(
        registry: Arc<dyn ConnectionRegistry>,
        fanout: Arc<Fanout>,
        clock: Arc<dyn Clock>,
        interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            registry,
            fanout,
            clock,
            interval,
            timeout,
        }
    }

    /// 1 回分のスイープ。削除した接続を返す
    pub async fn sweep(&self) -> Vec<TeardownOutcome> {
        let timeout_millis = i64::try_from(self.timeout.as_millis()).unwrap_or(i64::MAX);
        // last_activity < now - timeout  <=>  last_activity <= deadline
        let deadline = Timestamp::new(
            self.clock
                .now_millis()
                .saturating_sub(timeout_millis)
                .saturating_sub(1),
        );

        let stale: Vec<ConnectionId> = self
            .registry
            .activity_snapshot()
            .await
            .into_iter()
            .filter(|(_, last_activity)| *last_activity <= deadline)
            .map(|(connection_id, _)| connection_id)
            .collect();

        let mut evicted = Vec::new();
        for connection_id in stale {
            match self.fanout.evict_idle(&connection_id, deadline).await {
                Some(outcome) => {
                    tracing::info!("Connection '{}' timed out", connection_id);
                    evicted.push(outcome);
                }
                None => tracing::debug!(
                    "Connection '{}' became active during the sweep, keeping it",
                    connection_id
                ),
            }
        }
        evicted
    }

    /// バックグラウンドで定期的にスイープする。シャットダウン時に abort する
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            tracing::debug!(
                "Liveness monitor started (interval {:?}, timeout {:?})",
                self.interval,
                self.timeout
            );

            loop {
                ticker.tick().await;
                let evicted = self.sweep().await;
                if !evicted.is_empty() {
                    tracing::info!("Liveness sweep evicted {} connection(s)", evicted.len());
                }
            }
        })
    }
}
