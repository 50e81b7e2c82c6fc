//! WebSocket message DTOs
//!
//! Inbound frames are `{event, payload, ackId?}`. Payloads are first read into
//! the permissive `*Payload` structs below (every field optional) and then
//! validated into strict request types before any use case runs.
//!
//! Outbound frames are `{event, payload}` (see [`ServerEvent`]) and acks are
//! `{event: "ack", ackId, payload}` (see [`AckFrame`]).

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ========================================
// Inbound
// ========================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundFrame {
    pub event: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(default)]
    pub ack_id: Option<String>,
}

/// Every event name the coordinator understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    JoinClassroom,
    LeaveClassroom,
    SubmitAnswer,
    Typing,
    RequestQuestion,
    SendMessage,
    GetMessageHistory,
    StartSession,
    EndSession,
    ChangeLevel,
    StartVote,
    SubmitVote,
    EndVote,
    GetVoteResults,
    CreateRoom,
    JoinRoom,
    LeaveRoom,
    UpdateRoom,
    DeleteRoom,
    UpdateStatus,
    GetRoomPresence,
    Broadcast,
    Heartbeat,
}

impl EventName {
    pub const ALL: [EventName; 23] = [
        EventName::JoinClassroom,
        EventName::LeaveClassroom,
        EventName::SubmitAnswer,
        EventName::Typing,
        EventName::RequestQuestion,
        EventName::SendMessage,
        EventName::GetMessageHistory,
        EventName::StartSession,
        EventName::EndSession,
        EventName::ChangeLevel,
        EventName::StartVote,
        EventName::SubmitVote,
        EventName::EndVote,
        EventName::GetVoteResults,
        EventName::CreateRoom,
        EventName::JoinRoom,
        EventName::LeaveRoom,
        EventName::UpdateRoom,
        EventName::DeleteRoom,
        EventName::UpdateStatus,
        EventName::GetRoomPresence,
        EventName::Broadcast,
        EventName::Heartbeat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::JoinClassroom => "join-classroom",
            EventName::LeaveClassroom => "leave-classroom",
            EventName::SubmitAnswer => "submit-answer",
            EventName::Typing => "typing",
            EventName::RequestQuestion => "request-question",
            EventName::SendMessage => "send-message",
            EventName::GetMessageHistory => "get-message-history",
            EventName::StartSession => "start-session",
            EventName::EndSession => "end-session",
            EventName::ChangeLevel => "change-level",
            EventName::StartVote => "start-vote",
            EventName::SubmitVote => "submit-vote",
            EventName::EndVote => "end-vote",
            EventName::GetVoteResults => "get-vote-results",
            EventName::CreateRoom => "create-room",
            EventName::JoinRoom => "join-room",
            EventName::LeaveRoom => "leave-room",
            EventName::UpdateRoom => "update-room",
            EventName::DeleteRoom => "delete-room",
            EventName::UpdateStatus => "update-status",
            EventName::GetRoomPresence => "get-room-presence",
            EventName::Broadcast => "broadcast",
            EventName::Heartbeat => "heartbeat",
        }
    }

    pub fn parse(name: &str) -> Option<EventName> {
        Self::ALL.into_iter().find(|e| e.as_str() == name)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinClassroomPayload {
    pub classroom_id: Option<String>,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub user_type: Option<String>,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveClassroomPayload {
    pub classroom_id: Option<String>,
    pub user_id: Option<String>,
    pub user_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerPayload {
    pub classroom_id: Option<String>,
    pub session_id: Option<String>,
    pub question_id: Option<String>,
    pub answer: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingPayload {
    pub classroom_id: Option<String>,
    pub session_id: Option<String>,
    pub question_id: Option<String>,
    pub is_typing: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestQuestionPayload {
    pub classroom_id: Option<String>,
    pub session_id: Option<String>,
    pub topic: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    pub classroom_id: Option<String>,
    pub session_id: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageHistoryPayload {
    pub classroom_id: Option<String>,
    pub session_id: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionPayload {
    pub classroom_id: Option<String>,
    pub session_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndSessionPayload {
    pub classroom_id: Option<String>,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeLevelPayload {
    pub classroom_id: Option<String>,
    /// Clients send either a number or a label
    pub level: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartVotePayload {
    pub session_id: Option<String>,
    pub question: Option<String>,
    pub options: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitVotePayload {
    pub session_id: Option<String>,
    pub option_id: Option<String>,
}

/// end-vote / get-vote-results
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRefPayload {
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomPayload {
    pub room_id: Option<String>,
    pub name: Option<String>,
    pub metadata: Option<Value>,
}

/// join-room / leave-room / delete-room / get-room-presence
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRefPayload {
    pub room_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoomPayload {
    pub room_id: Option<String>,
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusPayload {
    pub status: Option<String>,
    pub activity: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastPayload {
    pub target: Option<String>,
    pub ids: Option<Vec<String>>,
    pub event: Option<String>,
    pub data: Option<Value>,
}

// ========================================
// Outbound
// ========================================

/// Server → client events, serialized as `{"event": "<kebab-case>", "payload": {...}}`
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum ServerEvent {
    StudentJoined(StudentJoinedDto),
    StudentLeft(StudentLeftDto),
    SessionStarted(SessionStartedDto),
    SessionEnded(SessionEndedDto),
    LevelChanged(LevelChangedDto),
    VoteStarted(VoteResultsDto),
    VoteUpdate(VoteResultsDto),
    VoteEnded(VoteResultsDto),
    NewMessage(MessageDto),
    AnswerSubmitted(MessageDto),
    QuestionRequested(MessageDto),
    UserTyping(UserTypingDto),
    RoomCreated(RoomDto),
    RoomUpdated(RoomDto),
    RoomDeleted(RoomDeletedDto),
    RoomMemberJoined(RoomMemberDto),
    RoomMemberLeft(RoomMemberDto),
    StatusUpdated(StatusUpdatedDto),
    Broadcast(BroadcastDto),
    Disconnect(DisconnectDto),
    Heartbeat(HeartbeatDto),
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::StudentJoined(_) => "student-joined",
            ServerEvent::StudentLeft(_) => "student-left",
            ServerEvent::SessionStarted(_) => "session-started",
            ServerEvent::SessionEnded(_) => "session-ended",
            ServerEvent::LevelChanged(_) => "level-changed",
            ServerEvent::VoteStarted(_) => "vote-started",
            ServerEvent::VoteUpdate(_) => "vote-update",
            ServerEvent::VoteEnded(_) => "vote-ended",
            ServerEvent::NewMessage(_) => "new-message",
            ServerEvent::AnswerSubmitted(_) => "answer-submitted",
            ServerEvent::QuestionRequested(_) => "question-requested",
            ServerEvent::UserTyping(_) => "user-typing",
            ServerEvent::RoomCreated(_) => "room-created",
            ServerEvent::RoomUpdated(_) => "room-updated",
            ServerEvent::RoomDeleted(_) => "room-deleted",
            ServerEvent::RoomMemberJoined(_) => "room-member-joined",
            ServerEvent::RoomMemberLeft(_) => "room-member-left",
            ServerEvent::StatusUpdated(_) => "status-updated",
            ServerEvent::Broadcast(_) => "broadcast",
            ServerEvent::Disconnect(_) => "disconnect",
            ServerEvent::Heartbeat(_) => "heartbeat",
        }
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentJoinedDto {
    pub classroom_id: String,
    pub user_id: String,
    pub user_name: String,
    pub user_type: String,
    pub total_students: usize,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentLeftDto {
    pub classroom_id: String,
    pub room_id: String,
    pub user_id: String,
    pub user_name: String,
    pub total_students: usize,
    /// `leave`, `disconnect` or `timeout`
    pub reason: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStartedDto {
    pub classroom_id: String,
    pub session_id: String,
    pub session_name: String,
    pub teacher_id: String,
    pub started_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEndedDto {
    pub classroom_id: String,
    pub session_id: String,
    pub started_at: i64,
    pub ended_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelChangedDto {
    pub classroom_id: String,
    pub level: String,
    pub previous_level: Option<String>,
    pub changed_by: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResultDto {
    pub option_id: String,
    pub text: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResultsDto {
    pub vote_id: String,
    pub session_id: String,
    pub question: String,
    pub results: Vec<VoteResultDto>,
    pub total_votes: usize,
    pub active: bool,
    pub created_at: i64,
    pub ended_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    pub room_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub sender_role: String,
    pub kind: String,
    pub content: String,
    pub question_id: Option<String>,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTypingDto {
    pub classroom_id: String,
    pub session_id: String,
    pub question_id: String,
    pub user_id: String,
    pub user_name: String,
    pub is_typing: bool,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDto {
    pub room_id: String,
    pub kind: String,
    pub metadata: Value,
    pub member_count: usize,
    pub created_by: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDeletedDto {
    pub room_id: String,
    pub deleted_by: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMemberDto {
    pub room_id: String,
    pub user_id: String,
    pub user_name: String,
    pub member_count: usize,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdatedDto {
    pub user_id: String,
    pub user_name: String,
    pub status: String,
    pub activity: Option<String>,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceDto {
    pub user_id: String,
    pub user_name: String,
    pub user_type: String,
    pub status: Option<String>,
    pub activity: Option<String>,
    pub updated_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastDto {
    pub event: String,
    pub data: Value,
    pub sender_id: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectDto {
    /// `session-replaced` or `timeout`
    pub reason: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatDto {
    pub timestamp: i64,
}

// ========================================
// Ack
// ========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AckErrorDto {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AckPayload {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<AckErrorDto>,
}

impl AckPayload {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(code: &str, message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(AckErrorDto {
                code: code.to_string(),
                message,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AckFrame {
    pub event: String,
    pub ack_id: String,
    pub payload: AckPayload,
}

impl AckFrame {
    pub fn new(ack_id: String, payload: AckPayload) -> Self {
        Self {
            event: "ack".to_string(),
            ack_id,
            payload,
        }
    }
}
