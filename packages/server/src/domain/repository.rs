//! Repository trait 定義
//!
//! ドメイン層が必要とするデータアクセスのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。
//!
//! - `ConnectionRegistry`: 接続 ↔ ユーザー ↔ ルームの索引（Connection Registry と Room/Presence Table）
//! - `RoomStateRepository`: ルーム単位の状態（投票・メッセージ履歴・授業セッション）

use async_trait::async_trait;

use super::{
    ChatMessage, ConnectionId, DisplayName, PresenceStatus, RegistryError, Room, RoomId, RoomKind,
    SessionError, SessionId, TeachingSession, Timestamp, UserId, UserRole, UserSession, VoteError,
    VoteSession,
};

/// Result of leaving a room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaveOutcome {
    /// Whether the user was a member before the call
    pub was_member: bool,
    /// Members left in the room (0 if the room no longer exists)
    pub member_count: usize,
}

/// A room touched by a teardown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffectedRoom {
    pub room_id: RoomId,
    pub kind: RoomKind,
    pub member_count: usize,
    pub removed: bool,
}

/// Everything a caller needs to announce a connection's departure
#[derive(Debug, Clone, PartialEq)]
pub struct TeardownOutcome {
    pub connection_id: ConnectionId,
    /// `None` when the connection never joined
    pub session: Option<UserSession>,
    pub rooms: Vec<AffectedRoom>,
}

/// A room member together with its presence data
#[derive(Debug, Clone, PartialEq)]
pub struct MemberPresence {
    pub connection_id: ConnectionId,
    pub user_id: UserId,
    pub display_name: DisplayName,
    pub role: UserRole,
    pub status: Option<PresenceStatus>,
}

/// Connection Registry / Room table
///
/// 全ての操作は単一のクリティカルセクション内で完結し、
/// 途中の状態が他の操作から観測されることはない。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConnectionRegistry: Send + Sync {
    /// ハンドシェイク時に未認証の接続を登録する
    async fn open(&self, connection_id: ConnectionId, now: Timestamp);

    /// 接続にユーザーを紐付ける
    ///
    /// 同じユーザーが別の接続で登録済みの場合、その接続は置き換えられ
    /// （ルームのメンバーシップは新しい接続に引き継がれる）、古い接続 ID が返る。
    async fn register(
        &self,
        connection_id: &ConnectionId,
        session: UserSession,
    ) -> Result<Option<ConnectionId>, RegistryError>;

    /// ユーザーの紐付けを解除する（接続自体は残る）。紐付いていたセッションを返す
    async fn unbind(&self, connection_id: &ConnectionId) -> Option<UserSession>;

    /// ルームに参加する（ルームが無ければ作成）。参加後のメンバー数を返す
    async fn join_room(
        &self,
        connection_id: &ConnectionId,
        room_id: &RoomId,
        kind: RoomKind,
        now: Timestamp,
    ) -> Result<usize, RegistryError>;

    /// 既存のルームにのみ参加する
    async fn join_existing_room(
        &self,
        connection_id: &ConnectionId,
        room_id: &RoomId,
    ) -> Result<usize, RegistryError>;

    /// ルームから退出する。空になったクラスルーム以外のルームは削除される
    async fn leave_room(
        &self,
        connection_id: &ConnectionId,
        room_id: &RoomId,
    ) -> Result<LeaveOutcome, RegistryError>;

    /// 接続と全てのメンバーシップを一度に削除する。既に無ければ `None`
    async fn teardown(&self, connection_id: &ConnectionId) -> Option<TeardownOutcome>;

    /// 最終アクティビティが `deadline` 以前のままであれば teardown する
    async fn teardown_if_idle(
        &self,
        connection_id: &ConnectionId,
        deadline: Timestamp,
    ) -> Option<TeardownOutcome>;

    /// 最終アクティビティを更新する
    async fn touch(&self, connection_id: &ConnectionId, now: Timestamp);

    /// 全接続の (接続 ID, 最終アクティビティ) のスナップショット
    async fn activity_snapshot(&self) -> Vec<(ConnectionId, Timestamp)>;

    async fn session_of(&self, connection_id: &ConnectionId) -> Option<UserSession>;

    /// 現在の授業セッションを記録する
    async fn set_current_session(
        &self,
        connection_id: &ConnectionId,
        session_id: Option<SessionId>,
    ) -> Result<(), RegistryError>;

    async fn connection_of(&self, user_id: &UserId) -> Option<ConnectionId>;

    async fn is_member(&self, connection_id: &ConnectionId, room_id: &RoomId) -> bool;

    /// ルームのメンバーの接続 ID
    async fn room_connections(&self, room_id: &RoomId) -> Vec<ConnectionId>;

    async fn room_member_count(&self, room_id: &RoomId) -> Option<usize>;

    async fn room_presence(&self, room_id: &RoomId) -> Option<Vec<MemberPresence>>;

    async fn room(&self, room_id: &RoomId) -> Option<Room>;

    async fn rooms(&self) -> Vec<Room>;

    /// 明示的にルームを作成する（breakout など）
    async fn create_room(&self, room: Room) -> Result<(), RegistryError>;

    async fn update_room_metadata(
        &self,
        room_id: &RoomId,
        metadata: serde_json::Value,
    ) -> Result<Room, RegistryError>;

    /// ルームを削除し、強制退出させたメンバーの接続 ID を返す
    async fn delete_room(&self, room_id: &RoomId) -> Result<Vec<ConnectionId>, RegistryError>;

    async fn set_status(
        &self,
        connection_id: &ConnectionId,
        status: PresenceStatus,
    ) -> Result<UserSession, RegistryError>;
}

/// ルーム単位の状態
///
/// 実装はルームごとにロックを持ち、同じルームへの操作は直列化、
/// 異なるルームへの操作は並行に実行できる。
#[async_trait]
pub trait RoomStateRepository: Send + Sync {
    /// 投票を開始する。アクティブな投票があれば `VoteAlreadyActive`
    async fn start_vote(
        &self,
        room_id: &RoomId,
        vote: VoteSession,
    ) -> Result<VoteSession, VoteError>;

    async fn submit_vote(
        &self,
        room_id: &RoomId,
        voter: UserId,
        option_id: &str,
    ) -> Result<VoteSession, VoteError>;

    async fn end_vote(&self, room_id: &RoomId, now: Timestamp) -> Result<VoteSession, VoteError>;

    async fn current_vote(&self, room_id: &RoomId) -> Option<VoteSession>;

    /// メッセージを追加し、追加後の履歴の長さを返す
    async fn append_message(&self, room_id: &RoomId, message: ChatMessage) -> usize;

    async fn recent_messages(&self, room_id: &RoomId, limit: usize) -> Vec<ChatMessage>;

    /// 授業セッションを開始する。ID はリポジトリが採番する
    async fn start_session(
        &self,
        classroom_id: &RoomId,
        name: String,
        teacher_id: UserId,
        now: Timestamp,
    ) -> Result<TeachingSession, SessionError>;

    /// アクティブな授業セッションを終了する（`session_id` 指定時は一致を確認）
    async fn end_session(
        &self,
        classroom_id: &RoomId,
        session_id: Option<&SessionId>,
        now: Timestamp,
    ) -> Result<TeachingSession, SessionError>;

    async fn active_session(&self, classroom_id: &RoomId) -> Option<TeachingSession>;

    /// 難易度を設定し、以前の値を返す
    async fn set_level(&self, classroom_id: &RoomId, level: String) -> Option<String>;

    /// ルームの状態を破棄する（ルーム削除時）
    async fn discard(&self, room_id: &RoomId);
}
