//! UseCase 層
//!
//! イベントごとのビジネスロジック。依存はコンストラクタで受け取り、
//! 全てのユースケースは `Result<_, CoordinatorError>` を返す。

pub mod broadcast;
pub mod connect_participant;
pub mod dialogue;
pub mod disconnect_participant;
pub mod error;
pub mod fanout;
pub mod guard;
pub mod join_classroom;
pub mod leave_classroom;
pub mod liveness;
pub mod room_lifecycle;
pub mod room_query;
pub mod status;
pub mod teacher_control;
pub mod vote;

#[cfg(test)]
pub(crate) mod test_support;

pub use broadcast::{BroadcastRequest, BroadcastResponse, BroadcastTarget, BroadcastUseCase};
pub use connect_participant::{ConnectParticipantUseCase, HeartbeatResponse};
pub use dialogue::{
    DialogueUseCase, MessageHistory, MessageHistoryRequest, MessagePosted,
    RequestQuestionRequest, SendMessageRequest, SubmitAnswerRequest, TypingRequest,
};
pub use disconnect_participant::DisconnectParticipantUseCase;
pub use error::CoordinatorError;
pub use fanout::{DepartureReason, Fanout};
pub use join_classroom::{JoinClassroomRequest, JoinClassroomResponse, JoinClassroomUseCase};
pub use leave_classroom::{LeaveClassroomRequest, LeaveClassroomResponse, LeaveClassroomUseCase};
pub use liveness::LivenessMonitor;
pub use room_lifecycle::{
    CreateRoomRequest, RoomDeleted, RoomLifecycleUseCase, RoomMembership, UpdateRoomRequest,
};
pub use room_query::RoomQueryUseCase;
pub use status::{RoomPresence, StatusUseCase, UpdateStatusRequest};
pub use teacher_control::{
    ChangeLevelRequest, EndSessionRequest, LevelChangedResponse, SessionEndedResponse,
    SessionStartedResponse, StartSessionRequest, TeacherControlUseCase,
};
pub use vote::{StartVoteRequest, SubmitVoteRequest, VoteUseCase};
