//! UseCase 共通: フレーム配信（Fan-out）
//!
//! 宛先の指定方法は 3 つ:
//! - 単一の接続（ack、heartbeat、disconnect 通知）
//! - ルームのメンバー（送信者を除外可能）
//! - 全接続
//!
//! 送信に失敗した接続は閉じたものとみなし、通常の切断と同じ経路で片付ける。
//! 片付けの通知でさらに失敗した接続はキューに積んで順に処理し、再帰はしない。
//! 片付けで Registry から消えたルームは、投票・履歴などの状態も破棄する。

use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

use lectern_shared::time::Clock;

use crate::domain::{
    ConnectionId, ConnectionRegistry, MessagePusher, RoomId, RoomStateRepository,
    TeardownOutcome, Timestamp, UserSession,
};
use crate::infrastructure::dto::websocket::{DisconnectDto, ServerEvent, StudentLeftDto};

/// 退出の理由（`student-left` の `reason`）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepartureReason {
    Leave,
    Disconnect,
    Timeout,
}

impl DepartureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DepartureReason::Leave => "leave",
            DepartureReason::Disconnect => "disconnect",
            DepartureReason::Timeout => "timeout",
        }
    }
}

pub struct Fanout {
    registry: Arc<dyn ConnectionRegistry>,
    room_state: Arc<dyn RoomStateRepository>,
    pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl Fanout {
    pub fn new(
        registry: Arc<dyn ConnectionRegistry>,
        room_state: Arc<dyn RoomStateRepository>,
        pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            room_state,
            pusher,
            clock,
        }
    }

    pub fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }

    /// 単一の接続に送信し、届いたかどうかを返す
    pub async fn to_connection(&self, connection_id: &ConnectionId, event: &ServerEvent) -> bool {
        match encode(event) {
            Some(frame) => self.deliver(vec![connection_id.clone()], &frame).await == 1,
            None => false,
        }
    }

    /// シリアライズ済みのフレーム（ack など）を単一の接続に送信
    pub async fn push_frame(&self, connection_id: &ConnectionId, frame: &str) -> bool {
        self.deliver(vec![connection_id.clone()], frame).await == 1
    }

    /// ルームのメンバーに送信し、届いた接続数を返す
    pub async fn to_room(
        &self,
        room_id: &RoomId,
        event: &ServerEvent,
        exclude: Option<&ConnectionId>,
    ) -> usize {
        let targets = self
            .registry
            .room_connections(room_id)
            .await
            .into_iter()
            .filter(|c| Some(c) != exclude)
            .collect();
        self.to_connections(targets, event).await
    }

    /// 複数のルームに送信する。複数のルームに属する接続にも 1 回だけ届く
    pub async fn to_rooms(&self, room_ids: &[RoomId], event: &ServerEvent) -> usize {
        let mut targets = BTreeSet::new();
        for room_id in room_ids {
            targets.extend(self.registry.room_connections(room_id).await);
        }
        self.to_connections(targets.into_iter().collect(), event)
            .await
    }

    /// 全ての接続に送信
    pub async fn to_all(&self, event: &ServerEvent) -> usize {
        let targets = self.pusher.connection_ids().await;
        self.to_connections(targets, event).await
    }

    pub async fn to_connections(&self, targets: Vec<ConnectionId>, event: &ServerEvent) -> usize {
        match encode(event) {
            Some(frame) => self.deliver(targets, &frame).await,
            None => 0,
        }
    }

    /// `disconnect` を通知してから送信チャンネルを破棄する（送信タスクが終了しソケットが閉じる）
    pub async fn close(&self, connection_id: &ConnectionId, reason: &str) {
        let event = ServerEvent::Disconnect(DisconnectDto {
            reason: reason.to_string(),
            timestamp: self.now().value(),
        });
        if let Some(frame) = encode(&event)
            && let Err(e) = self.pusher.push_to(connection_id, &frame).await
        {
            tracing::debug!(
                "Could not notify connection '{}' before closing: {}",
                connection_id,
                e
            );
        }
        self.pusher.unregister_client(connection_id).await;
    }

    /// 接続を片付け、参加していた全てのルームに `student-left` を通知する
    ///
    /// 既に片付け済みであれば何もしない（`None`）。
    pub async fn depart(
        &self,
        connection_id: &ConnectionId,
        reason: DepartureReason,
    ) -> Option<TeardownOutcome> {
        let outcome = self.registry.teardown(connection_id).await;
        self.pusher.unregister_client(connection_id).await;
        let outcome = outcome?;
        self.settle(vec![(outcome.clone(), reason)]).await;
        Some(outcome)
    }

    /// `deadline` 以降にアクティビティが無い場合に限り、タイムアウトとして片付ける
    pub async fn evict_idle(
        &self,
        connection_id: &ConnectionId,
        deadline: Timestamp,
    ) -> Option<TeardownOutcome> {
        let outcome = self
            .registry
            .teardown_if_idle(connection_id, deadline)
            .await?;
        self.close(connection_id, DepartureReason::Timeout.as_str())
            .await;
        self.settle(vec![(outcome.clone(), DepartureReason::Timeout)])
            .await;
        Some(outcome)
    }

    /// Registry から消えたルームの状態を破棄する
    pub async fn discard_if_removed(&self, room_id: &RoomId) {
        if self.registry.room(room_id).await.is_none() {
            self.room_state.discard(room_id).await;
        }
    }

    async fn deliver(&self, targets: Vec<ConnectionId>, frame: &str) -> usize {
        if targets.is_empty() {
            return 0;
        }
        let report = self.pusher.broadcast(targets, frame).await;
        if !report.failed.is_empty() {
            let mut pending = Vec::new();
            for connection_id in report.failed {
                if let Some(outcome) = self.reap(&connection_id).await {
                    pending.push((outcome, DepartureReason::Disconnect));
                }
            }
            self.settle(pending).await;
        }
        report.delivered
    }

    async fn reap(&self, connection_id: &ConnectionId) -> Option<TeardownOutcome> {
        self.pusher.unregister_client(connection_id).await;
        let outcome = self.registry.teardown(connection_id).await?;
        tracing::warn!(
            "Connection '{}' stopped accepting frames, tearing it down",
            connection_id
        );
        Some(outcome)
    }

    /// 退出を通知する。ルームごとにちょうど 1 回ずつ送る
    async fn settle(&self, initial: Vec<(TeardownOutcome, DepartureReason)>) {
        let mut queue: VecDeque<(TeardownOutcome, DepartureReason)> = initial.into();

        while let Some((outcome, reason)) = queue.pop_front() {
            for room in outcome.rooms.iter().filter(|r| r.removed) {
                self.room_state.discard(&room.room_id).await;
            }

            // 参加前の接続には通知するものが無い
            let Some(session) = &outcome.session else {
                continue;
            };

            for room in &outcome.rooms {
                let event = student_left(
                    session,
                    &room.room_id,
                    room.member_count,
                    reason,
                    self.now(),
                );
                let Some(frame) = encode(&event) else {
                    continue;
                };

                let targets = self.registry.room_connections(&room.room_id).await;
                let report = self.pusher.broadcast(targets, &frame).await;
                for connection_id in report.failed {
                    if let Some(next) = self.reap(&connection_id).await {
                        queue.push_back((next, DepartureReason::Disconnect));
                    }
                }
            }

            tracing::info!(
                "User '{}' left {} room(s) ({})",
                session.user_id,
                outcome.rooms.len(),
                reason.as_str()
            );
        }
    }
}

/// `student-left` イベントを組み立てる
pub fn student_left(
    session: &UserSession,
    room_id: &RoomId,
    member_count: usize,
    reason: DepartureReason,
    now: Timestamp,
) -> ServerEvent {
    ServerEvent::StudentLeft(StudentLeftDto {
        classroom_id: session.classroom_id.as_str().to_string(),
        room_id: room_id.as_str().to_string(),
        user_id: session.user_id.as_str().to_string(),
        user_name: session.display_name.as_str().to_string(),
        total_students: member_count,
        reason: reason.as_str().to_string(),
        timestamp: now.value(),
    })
}

fn encode(event: &ServerEvent) -> Option<String> {
    event
        .encode()
        .map_err(|e| tracing::error!("Failed to serialize '{}' event: {}", event.name(), e))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        ChatMessage, DisplayName, MessageContent, MessageKind, RoomKind, UserRole,
    };
    use crate::infrastructure::dto::websocket::HeartbeatDto;
    use crate::usecase::test_support::{Harness, drain, event_names};

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - ルーム宛て配信で送信者が除外されること
    // - 送信に失敗した接続が切断と同じ経路で片付けられること
    // - 片付けの通知中に別の接続が失敗しても、全て処理されること
    // - 片付けで消えたルームの状態（履歴・投票）が破棄されること
    // ========================================

    fn heartbeat() -> ServerEvent {
        ServerEvent::Heartbeat(HeartbeatDto { timestamp: 1 })
    }

    #[tokio::test]
    async fn test_to_room_excludes_sender() {
        // テスト項目: 送信者を除いたルームのメンバーにだけ届く
        // given (前提条件):
        let h = Harness::new();
        let (c1, mut rx1) = h.enroll("c1", "s1", UserRole::Student, "classroom-1").await;
        let (_c2, mut rx2) = h.enroll("c2", "s2", UserRole::Student, "classroom-1").await;
        let (_c3, mut rx3) = h.enroll("c3", "s3", UserRole::Student, "classroom-2").await;

        // when (操作):
        let delivered = h
            .fanout
            .to_room(&Harness::room("classroom-1"), &heartbeat(), Some(&c1))
            .await;

        // then (期待する結果):
        assert_eq!(delivered, 1);
        assert!(drain(&mut rx1).is_empty());
        assert_eq!(event_names(&drain(&mut rx2)), vec!["heartbeat"]);
        assert!(drain(&mut rx3).is_empty());
    }

    #[tokio::test]
    async fn test_failed_delivery_tears_down_connection() {
        // テスト項目: 送信に失敗した接続は片付けられ、残りのメンバーに student-left が届く
        // given (前提条件):
        let h = Harness::new();
        let (_c1, mut rx1) = h.enroll("c1", "s1", UserRole::Student, "classroom-1").await;
        let (c2, rx2) = h.enroll("c2", "s2", UserRole::Student, "classroom-1").await;
        drop(rx2);

        // when (操作):
        let delivered = h
            .fanout
            .to_room(&Harness::room("classroom-1"), &heartbeat(), None)
            .await;

        // then (期待する結果):
        assert_eq!(delivered, 1);
        assert!(h.registry.session_of(&c2).await.is_none());
        let frames = drain(&mut rx1);
        assert_eq!(event_names(&frames), vec!["heartbeat", "student-left"]);
        assert_eq!(frames[1]["payload"]["userId"], "s2");
        assert_eq!(frames[1]["payload"]["reason"], "disconnect");
        assert_eq!(frames[1]["payload"]["totalStudents"], 1);
    }

    #[tokio::test]
    async fn test_cascading_failures_are_all_settled() {
        // テスト項目: 退出通知の送信中に失敗した接続も片付けられ、その退出も通知される
        // given (前提条件):
        let h = Harness::new();
        let (_c1, mut rx1) = h.enroll("c1", "s1", UserRole::Student, "classroom-1").await;
        let (c2, _rx2) = h.enroll("c2", "s2", UserRole::Student, "classroom-1").await;
        let (c3, rx3) = h.enroll("c3", "s3", UserRole::Student, "classroom-1").await;
        drop(rx3);

        // when (操作):
        let outcome = h.fanout.depart(&c2, DepartureReason::Leave).await;

        // then (期待する結果):
        assert!(outcome.is_some());
        assert!(h.registry.session_of(&c3).await.is_none());
        let frames = drain(&mut rx1);
        assert_eq!(event_names(&frames), vec!["student-left", "student-left"]);
        assert_eq!(frames[0]["payload"]["userId"], "s2");
        assert_eq!(frames[0]["payload"]["reason"], "leave");
        assert_eq!(frames[1]["payload"]["userId"], "s3");
        assert_eq!(frames[1]["payload"]["totalStudents"], 1);
    }

    #[tokio::test]
    async fn test_depart_notifies_each_room_once() {
        // テスト項目: 参加していたルームごとにちょうど 1 回 student-left が届き、2 回目の depart は何もしない
        // given (前提条件):
        let h = Harness::new();
        let (c1, _rx1) = h.enroll("c1", "s1", UserRole::Student, "classroom-1").await;
        let (c2, mut rx2) = h.enroll("c2", "s2", UserRole::Student, "classroom-1").await;
        let sub_room = Harness::room("session:session-1");
        for c in [&c1, &c2] {
            h.registry
                .join_room(c, &sub_room, RoomKind::Session, h.fanout.now())
                .await
                .unwrap();
        }

        // when (操作):
        let first = h.fanout.depart(&c1, DepartureReason::Disconnect).await;
        let second = h.fanout.depart(&c1, DepartureReason::Disconnect).await;

        // then (期待する結果):
        assert_eq!(first.map(|o| o.rooms.len()), Some(2));
        assert!(second.is_none());
        let frames = drain(&mut rx2);
        assert_eq!(event_names(&frames), vec!["student-left", "student-left"]);
        let mut rooms: Vec<String> = frames
            .iter()
            .map(|f| f["payload"]["roomId"].as_str().unwrap().to_string())
            .collect();
        rooms.sort();
        assert_eq!(rooms, vec!["classroom-1", "session:session-1"]);
    }

    #[tokio::test]
    async fn test_depart_discards_state_of_removed_rooms() {
        // テスト項目: 最後のメンバーが片付けられたセッションルームの履歴は破棄され、クラスルームの履歴は残る
        // given (前提条件):
        let h = Harness::new();
        let (c1, _rx1) = h.enroll("c1", "s1", UserRole::Student, "classroom-1").await;
        let sub_room = Harness::room("session:session-1");
        h.registry
            .join_room(&c1, &sub_room, RoomKind::Session, h.fanout.now())
            .await
            .unwrap();
        let message = ChatMessage {
            sender_id: Harness::user("s1"),
            sender_name: DisplayName::new("S1".to_string()).unwrap(),
            sender_role: UserRole::Student,
            kind: MessageKind::Chat,
            content: MessageContent::new("hi".to_string()).unwrap(),
            question_id: None,
            timestamp: h.fanout.now(),
        };
        let classroom = Harness::room("classroom-1");
        for room_id in [&classroom, &sub_room] {
            h.room_state.append_message(room_id, message.clone()).await;
        }

        // when (操作):
        h.fanout.depart(&c1, DepartureReason::Disconnect).await;

        // then (期待する結果):
        assert!(h.registry.room(&sub_room).await.is_none());
        assert!(h.room_state.recent_messages(&sub_room, 10).await.is_empty());
        assert_eq!(h.room_state.recent_messages(&classroom, 10).await.len(), 1);
        assert_eq!(h.room_state.tracked_rooms().await, 1);
    }

    #[tokio::test]
    async fn test_close_sends_disconnect_and_closes_channel() {
        // テスト項目: close で disconnect が通知され、送信チャンネルが閉じる
        // given (前提条件):
        let h = Harness::new();
        let (c1, mut rx1) = h.connect("c1").await;

        // when (操作):
        h.fanout.close(&c1, "session-replaced").await;

        // then (期待する結果):
        let frames = drain(&mut rx1);
        assert_eq!(event_names(&frames), vec!["disconnect"]);
        assert_eq!(frames[0]["payload"]["reason"], "session-replaced");
        assert!(rx1.recv().await.is_none());
    }
}
