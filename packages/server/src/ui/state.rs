//! Server state (coordinator context).
//!
//! 全てのユースケースと設定を一つにまとめ、ハンドラーへ `Arc<AppState>` として渡す。

use std::sync::Arc;

use lectern_shared::time::Clock;

use crate::{
    config::ServerConfig,
    domain::{ClassroomHooks, ConnectionRegistry, MessagePusher, RoomStateRepository},
    usecase::{
        BroadcastUseCase, ConnectParticipantUseCase, DialogueUseCase,
        DisconnectParticipantUseCase, Fanout, JoinClassroomUseCase, LeaveClassroomUseCase,
        LivenessMonitor, RoomLifecycleUseCase, RoomQueryUseCase, StatusUseCase,
        TeacherControlUseCase, VoteUseCase,
    },
};

/// Shared application state
pub struct AppState {
    pub config: ServerConfig,
    /// ConnectParticipantUseCase（接続受け付け・heartbeat）
    pub connect_participant_usecase: Arc<ConnectParticipantUseCase>,
    /// DisconnectParticipantUseCase（切断時の後始末）
    pub disconnect_participant_usecase: Arc<DisconnectParticipantUseCase>,
    pub join_classroom_usecase: Arc<JoinClassroomUseCase>,
    pub leave_classroom_usecase: Arc<LeaveClassroomUseCase>,
    /// TeacherControlUseCase（授業セッション・難易度）
    pub teacher_control_usecase: Arc<TeacherControlUseCase>,
    pub vote_usecase: Arc<VoteUseCase>,
    /// DialogueUseCase（チャット・回答・質問リクエスト・入力中通知）
    pub dialogue_usecase: Arc<DialogueUseCase>,
    pub room_lifecycle_usecase: Arc<RoomLifecycleUseCase>,
    pub status_usecase: Arc<StatusUseCase>,
    pub broadcast_usecase: Arc<BroadcastUseCase>,
    /// RoomQueryUseCase（HTTP API 用）
    pub room_query_usecase: Arc<RoomQueryUseCase>,
    pub liveness_monitor: Arc<LivenessMonitor>,
}

impl AppState {
    /// 依存関係を組み立てる
    ///
    /// # Arguments
    ///
    /// * `config` - サーバー設定
    /// * `registry` - 接続 ↔ ユーザー ↔ ルームの索引
    /// * `room_state` - 投票・メッセージ履歴・授業セッション
    /// * `message_pusher` - 接続ごとの送信チャネル
    /// * `hooks` - メッセージ永続化・回答分析の外部フック
    /// * `clock` - タイムスタンプと生存判定に使う時計
    pub fn new(
        config: ServerConfig,
        registry: Arc<dyn ConnectionRegistry>,
        room_state: Arc<dyn RoomStateRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        hooks: Arc<dyn ClassroomHooks>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let fanout = Arc::new(Fanout::new(
            registry.clone(),
            room_state.clone(),
            message_pusher.clone(),
            clock.clone(),
        ));

        Self {
            connect_participant_usecase: Arc::new(ConnectParticipantUseCase::new(
                registry.clone(),
                message_pusher,
                fanout.clone(),
            )),
            disconnect_participant_usecase: Arc::new(DisconnectParticipantUseCase::new(
                fanout.clone(),
            )),
            join_classroom_usecase: Arc::new(JoinClassroomUseCase::new(
                registry.clone(),
                fanout.clone(),
            )),
            leave_classroom_usecase: Arc::new(LeaveClassroomUseCase::new(
                registry.clone(),
                fanout.clone(),
            )),
            teacher_control_usecase: Arc::new(TeacherControlUseCase::new(
                registry.clone(),
                room_state.clone(),
                fanout.clone(),
            )),
            vote_usecase: Arc::new(VoteUseCase::new(
                registry.clone(),
                room_state.clone(),
                fanout.clone(),
                config.max_vote_options,
            )),
            dialogue_usecase: Arc::new(DialogueUseCase::new(
                registry.clone(),
                room_state.clone(),
                hooks,
                fanout.clone(),
            )),
            room_lifecycle_usecase: Arc::new(RoomLifecycleUseCase::new(
                registry.clone(),
                room_state,
                fanout.clone(),
            )),
            status_usecase: Arc::new(StatusUseCase::new(registry.clone(), fanout.clone())),
            broadcast_usecase: Arc::new(BroadcastUseCase::new(registry.clone(), fanout.clone())),
            room_query_usecase: Arc::new(RoomQueryUseCase::new(registry.clone())),
            liveness_monitor: Arc::new(LivenessMonitor::new(
                registry,
                fanout,
                clock,
                config.heartbeat_interval,
                config.connection_timeout,
            )),
            config,
        }
    }
}
