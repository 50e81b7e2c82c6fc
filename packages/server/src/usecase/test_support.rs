//! UseCase テスト用のヘルパー
//!
//! 実際のインメモリ実装と mpsc の受信側を使って、クライアントが受け取る
//! フレームをそのまま検証できるようにする。

use std::sync::Arc;

use lectern_shared::time::ManualClock;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::domain::{
    ConnectionId, ConnectionRegistry, DisplayName, MessagePusher, RoomId, RoomKind, SessionId,
    UserId, UserRole, UserSession,
};
use crate::infrastructure::{
    message_pusher::WebSocketMessagePusher,
    repository::{InMemoryConnectionRegistry, InMemoryRoomStateRepository},
};

use super::fanout::Fanout;

pub const START_MILLIS: i64 = 1_700_000_000_000;

pub struct Harness {
    pub registry: Arc<InMemoryConnectionRegistry>,
    pub room_state: Arc<InMemoryRoomStateRepository>,
    pub pusher: Arc<WebSocketMessagePusher>,
    pub clock: Arc<ManualClock>,
    pub fanout: Arc<Fanout>,
}

impl Harness {
    pub fn new() -> Self {
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let room_state = Arc::new(InMemoryRoomStateRepository::default());
        let pusher = Arc::new(WebSocketMessagePusher::new());
        let clock = Arc::new(ManualClock::new(START_MILLIS));
        let fanout = Arc::new(Fanout::new(
            registry.clone(),
            room_state.clone(),
            pusher.clone(),
            clock.clone(),
        ));
        Self {
            registry,
            room_state,
            pusher,
            clock,
            fanout,
        }
    }

    pub fn room(id: &str) -> RoomId {
        RoomId::new(id.to_string()).unwrap()
    }

    pub fn user(id: &str) -> UserId {
        UserId::new(id.to_string()).unwrap()
    }

    pub fn session_id(id: &str) -> SessionId {
        SessionId::new(id.to_string()).unwrap()
    }

    /// ハンドシェイク直後（未参加）の接続
    pub async fn connect(&self, id: &str) -> (ConnectionId, mpsc::UnboundedReceiver<String>) {
        let connection_id = ConnectionId::new(id.to_string()).unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        self.registry
            .open(connection_id.clone(), self.fanout.now())
            .await;
        self.pusher.register_client(connection_id.clone(), tx).await;
        (connection_id, rx)
    }

    /// クラスルームに参加済みの接続
    pub async fn enroll(
        &self,
        id: &str,
        user: &str,
        role: UserRole,
        classroom: &str,
    ) -> (ConnectionId, mpsc::UnboundedReceiver<String>) {
        let (connection_id, rx) = self.connect(id).await;
        let classroom = Self::room(classroom);
        let session = UserSession::new(
            Self::user(user),
            DisplayName::new(user.to_uppercase()).unwrap(),
            role,
            classroom.clone(),
            None,
        );
        self.registry
            .register(&connection_id, session)
            .await
            .unwrap();
        self.registry
            .join_room(
                &connection_id,
                &classroom,
                RoomKind::Classroom,
                self.fanout.now(),
            )
            .await
            .unwrap();
        (connection_id, rx)
    }
}

/// 受信済みのフレームを全て取り出す
pub fn drain(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<Value> {
    let mut frames = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        frames.push(serde_json::from_str(&frame).unwrap());
    }
    frames
}

pub fn event_names(frames: &[Value]) -> Vec<&str> {
    frames
        .iter()
        .map(|f| f["event"].as_str().unwrap_or_default())
        .collect()
}
