//! InMemory RoomState Repository 実装
//!
//! ルームごとに `Arc<Mutex<RoomState>>` を持つ。外側のマップのロックは
//! ルームの検索・作成の間だけ保持し、投票やメッセージの更新はルームのロックで行う。
//! そのため異なるルームへの操作は並行に進み、同じルームへの操作は直列化される。

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicI64, Ordering},
    },
};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    ChatMessage, DEFAULT_MESSAGE_LOG_CAPACITY, MessageLog, RoomId, RoomStateRepository,
    SessionError, SessionId, TeachingSession, Timestamp, UserId, VoteError, VoteSession,
};

#[derive(Debug)]
struct RoomState {
    vote: Option<VoteSession>,
    messages: MessageLog,
    session: Option<TeachingSession>,
    level: Option<String>,
}

impl RoomState {
    fn new(message_capacity: usize) -> Self {
        Self {
            vote: None,
            messages: MessageLog::new(message_capacity),
            session: None,
            level: None,
        }
    }
}

pub struct InMemoryRoomStateRepository {
    rooms: Mutex<HashMap<RoomId, Arc<Mutex<RoomState>>>>,
    message_capacity: usize,
    /// Last issued session sequence (monotonic, seeded from the clock)
    session_sequence: AtomicI64,
}

impl Default for InMemoryRoomStateRepository {
    fn default() -> Self {
        Self::new(DEFAULT_MESSAGE_LOG_CAPACITY)
    }
}

impl InMemoryRoomStateRepository {
    pub fn new(message_capacity: usize) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            message_capacity,
            session_sequence: AtomicI64::new(0),
        }
    }

    async fn room(&self, room_id: &RoomId) -> Arc<Mutex<RoomState>> {
        let mut rooms = self.rooms.lock().await;
        rooms
            .entry(room_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(RoomState::new(self.message_capacity))))
            .clone()
    }

    /// 状態を保持しているルームの数
    #[cfg(test)]
    pub(crate) async fn tracked_rooms(&self) -> usize {
        self.rooms.lock().await.len()
    }

    async fn existing(&self, room_id: &RoomId) -> Option<Arc<Mutex<RoomState>>> {
        let rooms = self.rooms.lock().await;
        rooms.get(room_id).cloned()
    }

    /// Next id that is at least `now` and strictly greater than any id issued before
    fn next_session_sequence(&self, now: Timestamp) -> i64 {
        let mut current = self.session_sequence.load(Ordering::SeqCst);
        loop {
            let next = now.value().max(current + 1);
            match self.session_sequence.compare_exchange(
                current,
                next,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return next,
                Err(actual) => current = actual,
            }
        }
    }
}

#[async_trait]
impl RoomStateRepository for InMemoryRoomStateRepository {
    async fn start_vote(
        &self,
        room_id: &RoomId,
        vote: VoteSession,
    ) -> Result<VoteSession, VoteError> {
        let room = self.room(room_id).await;
        let mut state = room.lock().await;
        if state.vote.as_ref().is_some_and(|v| v.active) {
            return Err(VoteError::VoteAlreadyActive);
        }
        // An ended vote is replaced, never merged.
        state.vote = Some(vote.clone());
        Ok(vote)
    }

    async fn submit_vote(
        &self,
        room_id: &RoomId,
        voter: UserId,
        option_id: &str,
    ) -> Result<VoteSession, VoteError> {
        let room = self.existing(room_id).await.ok_or(VoteError::VoteNotFound)?;
        let mut state = room.lock().await;
        let vote = state.vote.as_mut().ok_or(VoteError::VoteNotFound)?;
        vote.submit(voter, option_id)?;
        Ok(vote.clone())
    }

    async fn end_vote(&self, room_id: &RoomId, now: Timestamp) -> Result<VoteSession, VoteError> {
        let room = self.existing(room_id).await.ok_or(VoteError::VoteNotFound)?;
        let mut state = room.lock().await;
        let vote = state.vote.as_mut().ok_or(VoteError::VoteNotFound)?;
        vote.end(now)?;
        Ok(vote.clone())
    }

    async fn current_vote(&self, room_id: &RoomId) -> Option<VoteSession> {
        let room = self.existing(room_id).await?;
        let state = room.lock().await;
        state.vote.clone()
    }

    async fn append_message(&self, room_id: &RoomId, message: ChatMessage) -> usize {
        let room = self.room(room_id).await;
        let mut state = room.lock().await;
        if let Some(evicted) = state.messages.push(message) {
            tracing::trace!(
                "Evicted message from '{}' in {} (capacity {})",
                evicted.sender_id,
                room_id,
                state.messages.capacity()
            );
        }
        state.messages.len()
    }

    async fn recent_messages(&self, room_id: &RoomId, limit: usize) -> Vec<ChatMessage> {
        let Some(room) = self.existing(room_id).await else {
            return Vec::new();
        };
        let state = room.lock().await;
        state.messages.recent(limit)
    }

    async fn start_session(
        &self,
        classroom_id: &RoomId,
        name: String,
        teacher_id: UserId,
        now: Timestamp,
    ) -> Result<TeachingSession, SessionError> {
        let room = self.room(classroom_id).await;
        let mut state = room.lock().await;
        if let Some(active) = state.session.as_ref().filter(|s| s.active) {
            return Err(SessionError::SessionAlreadyActive(
                active.id.as_str().to_string(),
            ));
        }

        let session = TeachingSession {
            id: SessionId::from_sequence(self.next_session_sequence(now)),
            classroom_id: classroom_id.clone(),
            name,
            teacher_id,
            started_at: now,
            ended_at: None,
            active: true,
        };
        state.session = Some(session.clone());
        Ok(session)
    }

    async fn end_session(
        &self,
        classroom_id: &RoomId,
        session_id: Option<&SessionId>,
        now: Timestamp,
    ) -> Result<TeachingSession, SessionError> {
        let room = self
            .existing(classroom_id)
            .await
            .ok_or(SessionError::SessionNotFound)?;
        let mut state = room.lock().await;
        let session = state
            .session
            .as_mut()
            .filter(|s| s.active)
            .filter(|s| session_id.is_none_or(|id| &s.id == id))
            .ok_or(SessionError::SessionNotFound)?;
        session.active = false;
        session.ended_at = Some(now);
        Ok(session.clone())
    }

    async fn active_session(&self, classroom_id: &RoomId) -> Option<TeachingSession> {
        let room = self.existing(classroom_id).await?;
        let state = room.lock().await;
        state.session.clone().filter(|s| s.active)
    }

    async fn set_level(&self, classroom_id: &RoomId, level: String) -> Option<String> {
        let room = self.room(classroom_id).await;
        let mut state = room.lock().await;
        state.level.replace(level)
    }

    async fn discard(&self, room_id: &RoomId) {
        let mut rooms = self.rooms.lock().await;
        if rooms.remove(room_id).is_some() {
            tracing::debug!("Discarded room state of {}", room_id);
        }
    }
}
