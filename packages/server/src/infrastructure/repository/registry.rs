//! InMemory Connection Registry 実装
//!
//! 接続・ユーザー・ルームの 3 つの索引を 1 つの Mutex で保護する。
//! teardown は複数のルームにまたがるため、索引ごとに別々のロックを持つと
//! 途中の状態が観測されてしまう。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    AffectedRoom, Connection, ConnectionId, ConnectionRegistry, LeaveOutcome, MemberPresence,
    PresenceStatus, RegistryError, Room, RoomId, RoomKind, SessionId, TeardownOutcome, Timestamp,
    UserId, UserSession,
};

/// ユーザーと、そのユーザーを現在表している接続の対応
#[derive(Debug, Clone)]
struct Binding {
    connection_id: ConnectionId,
    session: UserSession,
}

#[derive(Debug, Default)]
struct RegistryState {
    connections: HashMap<ConnectionId, Connection>,
    users: HashMap<UserId, Binding>,
    rooms: HashMap<RoomId, Room>,
}

impl RegistryState {
    fn bound_user(&self, connection_id: &ConnectionId) -> Result<UserId, RegistryError> {
        self.connections
            .get(connection_id)
            .and_then(|c| c.user_id.clone())
            .ok_or_else(|| RegistryError::ConnectionNotFound(connection_id.to_string()))
    }

    fn binding_of(&self, connection_id: &ConnectionId) -> Option<&Binding> {
        let user_id = self.connections.get(connection_id)?.user_id.as_ref()?;
        self.users
            .get(user_id)
            .filter(|b| &b.connection_id == connection_id)
    }

    fn binding_of_mut(&mut self, connection_id: &ConnectionId) -> Option<&mut Binding> {
        let user_id = self.connections.get(connection_id)?.user_id.clone()?;
        self.users
            .get_mut(&user_id)
            .filter(|b| &b.connection_id == connection_id)
    }

    /// Remove `user_id` from `room_id`, dropping the room when it may not stay empty
    fn remove_membership(&mut self, room_id: &RoomId, user_id: &UserId) -> Option<AffectedRoom> {
        let room = self.rooms.get_mut(room_id)?;
        room.remove_member(user_id);
        let affected = AffectedRoom {
            room_id: room_id.clone(),
            kind: room.kind,
            member_count: room.member_count(),
            removed: room.should_be_removed(),
        };
        if affected.removed {
            self.rooms.remove(room_id);
            tracing::debug!("Room '{}' removed after its last member left", room_id);
        }
        Some(affected)
    }

    fn detach(&mut self, connection_id: &ConnectionId) -> Option<TeardownOutcome> {
        let connection = self.connections.remove(connection_id)?;

        let session = match &connection.user_id {
            Some(user_id)
                if self
                    .users
                    .get(user_id)
                    .is_some_and(|b| &b.connection_id == connection_id) =>
            {
                self.users.remove(user_id).map(|b| b.session)
            }
            _ => None,
        };

        let mut rooms = Vec::new();
        if let Some(user_id) = &connection.user_id {
            for room_id in &connection.rooms {
                if let Some(affected) = self.remove_membership(room_id, user_id) {
                    rooms.push(affected);
                }
            }
        }

        Some(TeardownOutcome {
            connection_id: connection.id,
            session,
            rooms,
        })
    }
}

/// インメモリ Connection Registry 実装
#[derive(Default)]
pub struct InMemoryConnectionRegistry {
    state: Mutex<RegistryState>,
}

impl InMemoryConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConnectionRegistry for InMemoryConnectionRegistry {
    async fn open(&self, connection_id: ConnectionId, now: Timestamp) {
        let mut state = self.state.lock().await;
        state
            .connections
            .entry(connection_id.clone())
            .or_insert_with(|| Connection::new(connection_id, now));
    }

    async fn register(
        &self,
        connection_id: &ConnectionId,
        session: UserSession,
    ) -> Result<Option<ConnectionId>, RegistryError> {
        let mut state = self.state.lock().await;
        let state = &mut *state;

        let previous_user = state
            .connections
            .get(connection_id)
            .ok_or_else(|| RegistryError::ConnectionNotFound(connection_id.to_string()))?
            .user_id
            .clone();

        // The connection switches identity: drop what the previous user held through it.
        if let Some(previous_user) = previous_user.filter(|u| u != &session.user_id) {
            let rooms = state
                .connections
                .get_mut(connection_id)
                .map(|c| std::mem::take(&mut c.rooms))
                .unwrap_or_default();
            for room_id in &rooms {
                state.remove_membership(room_id, &previous_user);
            }
            state.users.remove(&previous_user);
        }

        // The user is live on another connection: that connection is superseded and
        // its memberships move over, so member sets stay unchanged.
        let mut superseded = None;
        let mut status = None;
        if let Some(existing) = state.users.get(&session.user_id) {
            status = existing.session.status.clone();
            if &existing.connection_id != connection_id {
                let old_id = existing.connection_id.clone();
                if let Some(old) = state.connections.remove(&old_id)
                    && let Some(connection) = state.connections.get_mut(connection_id)
                {
                    connection.rooms.extend(old.rooms);
                }
                superseded = Some(old_id);
            }
        }

        if let Some(connection) = state.connections.get_mut(connection_id) {
            connection.user_id = Some(session.user_id.clone());
        }
        let user_id = session.user_id.clone();
        let mut session = session;
        if session.status.is_none() {
            session.status = status;
        }
        state.users.insert(
            user_id,
            Binding {
                connection_id: connection_id.clone(),
                session,
            },
        );

        Ok(superseded)
    }

    async fn unbind(&self, connection_id: &ConnectionId) -> Option<UserSession> {
        let mut state = self.state.lock().await;
        let state = &mut *state;

        let connection = state.connections.get_mut(connection_id)?;
        let user_id = connection.user_id.take()?;
        let rooms = std::mem::take(&mut connection.rooms);
        for room_id in &rooms {
            state.remove_membership(room_id, &user_id);
        }

        let owned = state
            .users
            .get(&user_id)
            .is_some_and(|b| &b.connection_id == connection_id);
        if owned {
            state.users.remove(&user_id).map(|b| b.session)
        } else {
            None
        }
    }

    async fn join_room(
        &self,
        connection_id: &ConnectionId,
        room_id: &RoomId,
        kind: RoomKind,
        now: Timestamp,
    ) -> Result<usize, RegistryError> {
        let mut state = self.state.lock().await;
        let user_id = state.bound_user(connection_id)?;

        let room = state
            .rooms
            .entry(room_id.clone())
            .or_insert_with(|| Room::new(room_id.clone(), kind, now));
        if room.kind != kind {
            return Err(RegistryError::RoomKindMismatch {
                room_id: room_id.to_string(),
                requested: kind,
                actual: room.kind,
            });
        }
        room.add_member(user_id);
        let count = room.member_count();

        if let Some(connection) = state.connections.get_mut(connection_id) {
            connection.rooms.insert(room_id.clone());
        }
        Ok(count)
    }

    async fn join_existing_room(
        &self,
        connection_id: &ConnectionId,
        room_id: &RoomId,
    ) -> Result<usize, RegistryError> {
        let mut state = self.state.lock().await;
        let user_id = state.bound_user(connection_id)?;

        let room = state
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| RegistryError::RoomNotFound(room_id.to_string()))?;
        room.add_member(user_id);
        let count = room.member_count();

        if let Some(connection) = state.connections.get_mut(connection_id) {
            connection.rooms.insert(room_id.clone());
        }
        Ok(count)
    }

    async fn leave_room(
        &self,
        connection_id: &ConnectionId,
        room_id: &RoomId,
    ) -> Result<LeaveOutcome, RegistryError> {
        let mut state = self.state.lock().await;
        let user_id = state.bound_user(connection_id)?;

        let was_member = state
            .connections
            .get_mut(connection_id)
            .is_some_and(|c| c.rooms.remove(room_id));

        let member_count = if was_member {
            state
                .remove_membership(room_id, &user_id)
                .map(|affected| affected.member_count)
                .unwrap_or(0)
        } else {
            state.rooms.get(room_id).map_or(0, Room::member_count)
        };

        Ok(LeaveOutcome {
            was_member,
            member_count,
        })
    }

    async fn teardown(&self, connection_id: &ConnectionId) -> Option<TeardownOutcome> {
        let mut state = self.state.lock().await;
        state.detach(connection_id)
    }

    async fn teardown_if_idle(
        &self,
        connection_id: &ConnectionId,
        deadline: Timestamp,
    ) -> Option<TeardownOutcome> {
        let mut state = self.state.lock().await;
        let idle = state
            .connections
            .get(connection_id)
            .is_some_and(|c| c.last_activity <= deadline);
        if !idle {
            return None;
        }
        state.detach(connection_id)
    }

    async fn touch(&self, connection_id: &ConnectionId, now: Timestamp) {
        let mut state = self.state.lock().await;
        if let Some(connection) = state.connections.get_mut(connection_id)
            && connection.last_activity < now
        {
            connection.last_activity = now;
        }
    }

    async fn activity_snapshot(&self) -> Vec<(ConnectionId, Timestamp)> {
        let state = self.state.lock().await;
        state
            .connections
            .values()
            .map(|c| (c.id.clone(), c.last_activity))
            .collect()
    }

    async fn session_of(&self, connection_id: &ConnectionId) -> Option<UserSession> {
        let state = self.state.lock().await;
        state.binding_of(connection_id).map(|b| b.session.clone())
    }

    async fn set_current_session(
        &self,
        connection_id: &ConnectionId,
        session_id: Option<SessionId>,
    ) -> Result<(), RegistryError> {
        let mut state = self.state.lock().await;
        let binding = state
            .binding_of_mut(connection_id)
            .ok_or_else(|| RegistryError::ConnectionNotFound(connection_id.to_string()))?;
        binding.session.session_id = session_id;
        Ok(())
    }

    async fn connection_of(&self, user_id: &UserId) -> Option<ConnectionId> {
        let state = self.state.lock().await;
        state.users.get(user_id).map(|b| b.connection_id.clone())
    }

    async fn is_member(&self, connection_id: &ConnectionId, room_id: &RoomId) -> bool {
        let state = self.state.lock().await;
        state
            .connections
            .get(connection_id)
            .is_some_and(|c| c.rooms.contains(room_id))
    }

    async fn room_connections(&self, room_id: &RoomId) -> Vec<ConnectionId> {
        let state = self.state.lock().await;
        let Some(room) = state.rooms.get(room_id) else {
            return Vec::new();
        };
        room.members()
            .filter_map(|user_id| state.users.get(user_id))
            .map(|b| b.connection_id.clone())
            .collect()
    }

    async fn room_member_count(&self, room_id: &RoomId) -> Option<usize> {
        let state = self.state.lock().await;
        state.rooms.get(room_id).map(Room::member_count)
    }

    async fn room_presence(&self, room_id: &RoomId) -> Option<Vec<MemberPresence>> {
        let state = self.state.lock().await;
        let room = state.rooms.get(room_id)?;
        Some(
            room.members()
                .filter_map(|user_id| state.users.get(user_id))
                .map(|b| MemberPresence {
                    connection_id: b.connection_id.clone(),
                    user_id: b.session.user_id.clone(),
                    display_name: b.session.display_name.clone(),
                    role: b.session.role,
                    status: b.session.status.clone(),
                })
                .collect(),
        )
    }

    async fn room(&self, room_id: &RoomId) -> Option<Room> {
        let state = self.state.lock().await;
        state.rooms.get(room_id).cloned()
    }

    async fn rooms(&self) -> Vec<Room> {
        let state = self.state.lock().await;
        let mut rooms: Vec<Room> = state.rooms.values().cloned().collect();
        rooms.sort_by(|a, b| a.id.cmp(&b.id));
        rooms
    }

    async fn create_room(&self, room: Room) -> Result<(), RegistryError> {
        let mut state = self.state.lock().await;
        if state.rooms.contains_key(&room.id) {
            return Err(RegistryError::RoomAlreadyExists(room.id.to_string()));
        }
        state.rooms.insert(room.id.clone(), room);
        Ok(())
    }

    async fn update_room_metadata(
        &self,
        room_id: &RoomId,
        metadata: serde_json::Value,
    ) -> Result<Room, RegistryError> {
        let mut state = self.state.lock().await;
        let room = state
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| RegistryError::RoomNotFound(room_id.to_string()))?;
        room.metadata = metadata;
        Ok(room.clone())
    }

    async fn delete_room(&self, room_id: &RoomId) -> Result<Vec<ConnectionId>, RegistryError> {
        let mut state = self.state.lock().await;
        let room = state
            .rooms
            .remove(room_id)
            .ok_or_else(|| RegistryError::RoomNotFound(room_id.to_string()))?;

        let mut evicted = Vec::new();
        for user_id in room.members() {
            let Some(connection_id) = state.users.get(user_id).map(|b| b.connection_id.clone())
            else {
                continue;
            };
            if let Some(connection) = state.connections.get_mut(&connection_id) {
                connection.rooms.remove(room_id);
            }
            evicted.push(connection_id);
        }
        Ok(evicted)
    }

    async fn set_status(
        &self,
        connection_id: &ConnectionId,
        status: PresenceStatus,
    ) -> Result<UserSession, RegistryError> {
        let mut state = self.state.lock().await;
        let binding = state
            .binding_of_mut(connection_id)
            .ok_or_else(|| RegistryError::ConnectionNotFound(connection_id.to_string()))?;
        binding.session.status = Some(status);
        Ok(binding.session.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DisplayName, UserRole};

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - 接続 ↔ ユーザー ↔ ルームの索引の整合性
    // - join / leave / teardown によるメンバー数の変化とルームの削除
    // - 同一ユーザーの再接続（置き換え）
    // - teardown_if_idle がアクティビティを再確認すること
    //
    // 【なぜこのテストが必要か】
    // - ルームのメンバー数 == メンバー集合の大きさ、という不変条件を全ての
    //   UseCase が前提にしている
    // ========================================

    fn conn(id: &str) -> ConnectionId {
        ConnectionId::new(id.to_string()).unwrap()
    }

    fn room(id: &str) -> RoomId {
        RoomId::new(id.to_string()).unwrap()
    }

    fn session(user: &str, role: UserRole) -> UserSession {
        UserSession::new(
            UserId::new(user.to_string()).unwrap(),
            DisplayName::new(user.to_uppercase()).unwrap(),
            role,
            room("classroom-1"),
            None,
        )
    }

    async fn registered(registry: &InMemoryConnectionRegistry, id: &str, user: &str) -> ConnectionId {
        let connection_id = conn(id);
        registry.open(connection_id.clone(), Timestamp::new(0)).await;
        registry
            .register(&connection_id, session(user, UserRole::Student))
            .await
            .unwrap();
        connection_id
    }

    #[tokio::test]
    async fn test_join_room_unregistered_connection_fails() {
        // テスト項目: 未登録の接続でルームに参加すると ConnectionNotFound になる
        // given (前提条件):
        let registry = InMemoryConnectionRegistry::new();
        registry.open(conn("c1"), Timestamp::new(0)).await;

        // when (操作):
        let result = registry
            .join_room(&conn("c1"), &room("classroom-1"), RoomKind::Classroom, Timestamp::new(0))
            .await;

        // then (期待する結果):
        assert_eq!(result, Err(RegistryError::ConnectionNotFound("c1".to_string())));
        assert!(registry.rooms().await.is_empty());
    }

    #[tokio::test]
    async fn test_join_room_with_different_kind_fails() {
        // テスト項目: 既存のルームに別の種類として参加しようとすると RoomKindMismatch になり、メンバーは増えない
        // given (前提条件):
        let registry = InMemoryConnectionRegistry::new();
        let c1 = registered(&registry, "c1", "s1").await;
        let c2 = registered(&registry, "c2", "s2").await;
        let sub_room = room("session:session-1");
        registry
            .join_room(&c1, &sub_room, RoomKind::Session, Timestamp::new(1))
            .await
            .unwrap();

        // when (操作):
        let result = registry
            .join_room(&c2, &sub_room, RoomKind::Classroom, Timestamp::new(2))
            .await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(RegistryError::RoomKindMismatch {
                room_id: "session:session-1".to_string(),
                requested: RoomKind::Classroom,
                actual: RoomKind::Session,
            })
        );
        assert_eq!(registry.room_member_count(&sub_room).await, Some(1));
        assert!(!registry.is_member(&c2, &sub_room).await);
    }

    #[tokio::test]
    async fn test_member_count_follows_joins_and_leaves() {
        // テスト項目: join/leave の列に対してメンバー数が参加中のユーザー数と一致する
        // given (前提条件):
        let registry = InMemoryConnectionRegistry::new();
        let c1 = registered(&registry, "c1", "s1").await;
        let c2 = registered(&registry, "c2", "s2").await;
        let classroom = room("classroom-1");

        // when (操作):
        let first = registry
            .join_room(&c1, &classroom, RoomKind::Classroom, Timestamp::new(1))
            .await
            .unwrap();
        let again = registry
            .join_room(&c1, &classroom, RoomKind::Classroom, Timestamp::new(2))
            .await
            .unwrap();
        let second = registry
            .join_room(&c2, &classroom, RoomKind::Classroom, Timestamp::new(3))
            .await
            .unwrap();
        let left = registry.leave_room(&c1, &classroom).await.unwrap();

        // then (期待する結果):
        assert_eq!((first, again, second), (1, 1, 2));
        assert_eq!(
            left,
            LeaveOutcome {
                was_member: true,
                member_count: 1
            }
        );
        assert_eq!(registry.room_member_count(&classroom).await, Some(1));
        assert_eq!(registry.room_connections(&classroom).await, vec![c2]);
    }

    #[tokio::test]
    async fn test_empty_session_room_is_removed_but_classroom_persists() {
        // テスト項目: 全員が退出するとセッションルームは削除され、クラスルームは残る
        // given (前提条件):
        let registry = InMemoryConnectionRegistry::new();
        let c1 = registered(&registry, "c1", "s1").await;
        let classroom = room("classroom-1");
        let sub_room = room("session:session-1");
        registry
            .join_room(&c1, &classroom, RoomKind::Classroom, Timestamp::new(1))
            .await
            .unwrap();
        registry
            .join_room(&c1, &sub_room, RoomKind::Session, Timestamp::new(1))
            .await
            .unwrap();

        // when (操作):
        registry.leave_room(&c1, &sub_room).await.unwrap();
        registry.leave_room(&c1, &classroom).await.unwrap();

        // then (期待する結果):
        assert!(registry.room(&sub_room).await.is_none());
        assert_eq!(registry.room_member_count(&classroom).await, Some(0));
    }

    #[tokio::test]
    async fn test_leave_room_without_membership_is_noop() {
        // テスト項目: 参加していないルームからの退出は was_member = false で成功する
        // given (前提条件):
        let registry = InMemoryConnectionRegistry::new();
        let c1 = registered(&registry, "c1", "s1").await;

        // when (操作):
        let result = registry.leave_room(&c1, &room("classroom-9")).await;

        // then (期待する結果):
        assert_eq!(
            result,
            Ok(LeaveOutcome {
                was_member: false,
                member_count: 0
            })
        );
    }

    #[tokio::test]
    async fn test_teardown_removes_all_memberships_at_once() {
        // テスト項目: teardown で接続と全てのメンバーシップが削除され、影響したルームが返る
        // given (前提条件):
        let registry = InMemoryConnectionRegistry::new();
        let c1 = registered(&registry, "c1", "s1").await;
        let c2 = registered(&registry, "c2", "s2").await;
        let classroom = room("classroom-1");
        let breakout = room("group-a");
        for c in [&c1, &c2] {
            registry
                .join_room(c, &classroom, RoomKind::Classroom, Timestamp::new(1))
                .await
                .unwrap();
        }
        registry
            .join_room(&c1, &breakout, RoomKind::Breakout, Timestamp::new(1))
            .await
            .unwrap();

        // when (操作):
        let outcome = registry.teardown(&c1).await.unwrap();
        let second = registry.teardown(&c1).await;

        // then (期待する結果):
        assert_eq!(outcome.session.map(|s| s.user_id.into_string()), Some("s1".to_string()));
        assert_eq!(outcome.rooms.len(), 2);
        let classroom_entry = outcome.rooms.iter().find(|r| r.room_id == classroom).unwrap();
        assert_eq!(classroom_entry.member_count, 1);
        assert!(!classroom_entry.removed);
        let breakout_entry = outcome.rooms.iter().find(|r| r.room_id == breakout).unwrap();
        assert!(breakout_entry.removed);
        assert!(second.is_none());
        assert!(registry.session_of(&c1).await.is_none());
        assert_eq!(registry.room_connections(&classroom).await, vec![c2]);
    }

    #[tokio::test]
    async fn test_register_same_user_supersedes_old_connection() {
        // テスト項目: 同じユーザーが別接続で登録すると古い接続は置き換えられ、メンバーシップが引き継がれる
        // given (前提条件):
        let registry = InMemoryConnectionRegistry::new();
        let old = registered(&registry, "old", "s1").await;
        let classroom = room("classroom-1");
        registry
            .join_room(&old, &classroom, RoomKind::Classroom, Timestamp::new(1))
            .await
            .unwrap();
        let new = conn("new");
        registry.open(new.clone(), Timestamp::new(2)).await;

        // when (操作):
        let superseded = registry
            .register(&new, session("s1", UserRole::Student))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(superseded, Some(old.clone()));
        assert!(registry.teardown(&old).await.is_none());
        assert!(registry.is_member(&new, &classroom).await);
        assert_eq!(registry.room_member_count(&classroom).await, Some(1));
        assert_eq!(registry.room_connections(&classroom).await, vec![new]);
    }

    #[tokio::test]
    async fn test_teardown_if_idle_skips_recently_touched_connection() {
        // テスト項目: deadline より後に touch された接続は teardown_if_idle で削除されない
        // given (前提条件):
        let registry = InMemoryConnectionRegistry::new();
        let c1 = registered(&registry, "c1", "s1").await;
        let snapshot = registry.activity_snapshot().await;
        registry.touch(&c1, Timestamp::new(500)).await;

        // when (操作):
        let result = registry.teardown_if_idle(&c1, Timestamp::new(100)).await;

        // then (期待する結果):
        assert_eq!(snapshot, vec![(c1.clone(), Timestamp::new(0))]);
        assert!(result.is_none());
        assert!(registry.session_of(&c1).await.is_some());
    }

    #[tokio::test]
    async fn test_delete_room_evicts_every_member() {
        // テスト項目: ルーム削除で全メンバーのメンバーシップが外れ、接続 ID が返る
        // given (前提条件):
        let registry = InMemoryConnectionRegistry::new();
        let c1 = registered(&registry, "c1", "s1").await;
        let c2 = registered(&registry, "c2", "s2").await;
        let breakout = room("group-a");
        registry
            .create_room(Room::new(breakout.clone(), RoomKind::Breakout, Timestamp::new(0)))
            .await
            .unwrap();
        for c in [&c1, &c2] {
            registry.join_existing_room(c, &breakout).await.unwrap();
        }

        // when (操作):
        let mut evicted = registry.delete_room(&breakout).await.unwrap();
        evicted.sort();

        // then (期待する結果):
        assert_eq!(evicted, vec![c1.clone(), c2]);
        assert!(!registry.is_member(&c1, &breakout).await);
        assert_eq!(
            registry.join_existing_room(&c1, &breakout).await,
            Err(RegistryError::RoomNotFound("group-a".to_string()))
        );
    }

    #[tokio::test]
    async fn test_unbind_keeps_connection_but_drops_identity() {
        // テスト項目: unbind でユーザーの紐付けとメンバーシップが外れ、接続は残る
        // given (前提条件):
        let registry = InMemoryConnectionRegistry::new();
        let c1 = registered(&registry, "c1", "s1").await;
        let classroom = room("classroom-1");
        registry
            .join_room(&c1, &classroom, RoomKind::Classroom, Timestamp::new(1))
            .await
            .unwrap();

        // when (操作):
        let released = registry.unbind(&c1).await;

        // then (期待する結果):
        assert_eq!(released.map(|s| s.user_id.into_string()), Some("s1".to_string()));
        assert!(registry.session_of(&c1).await.is_none());
        assert_eq!(registry.room_member_count(&classroom).await, Some(0));
        assert_eq!(registry.activity_snapshot().await.len(), 1);
        assert!(registry.connection_of(&UserId::new("s1".to_string()).unwrap()).await.is_none());
    }
}
