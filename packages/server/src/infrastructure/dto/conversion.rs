//! Conversion logic from domain entities to DTOs.

use lectern_shared::time::timestamp_to_rfc3339;

use crate::domain::{ChatMessage, MemberPresence, Room, RoomId, RoomKind, VoteSession};
use crate::infrastructure::dto::{http, websocket as dto};

pub fn room_kind_str(kind: RoomKind) -> &'static str {
    match kind {
        RoomKind::Classroom => "classroom",
        RoomKind::Session => "session",
        RoomKind::Breakout => "breakout",
    }
}

/// Vote results for the room `session:<id>`; the session id is given by the caller
pub fn vote_results(vote: &VoteSession, session_id: &str) -> dto::VoteResultsDto {
    dto::VoteResultsDto {
        vote_id: vote.id.clone(),
        session_id: session_id.to_string(),
        question: vote.question.clone(),
        results: vote
            .options
            .iter()
            .map(|o| dto::VoteResultDto {
                option_id: o.id.clone(),
                text: o.text.clone(),
                count: o.count,
            })
            .collect(),
        total_votes: vote.total_votes(),
        active: vote.active,
        created_at: vote.created_at.value(),
        ended_at: vote.ended_at.map(|t| t.value()),
    }
}

pub fn message(room_id: &RoomId, message: &ChatMessage) -> dto::MessageDto {
    dto::MessageDto {
        room_id: room_id.as_str().to_string(),
        sender_id: message.sender_id.as_str().to_string(),
        sender_name: message.sender_name.as_str().to_string(),
        sender_role: message.sender_role.as_str().to_string(),
        kind: message.kind.as_str().to_string(),
        content: message.content.as_str().to_string(),
        question_id: message.question_id.clone(),
        timestamp: message.timestamp.value(),
    }
}

pub fn room(room: &Room) -> dto::RoomDto {
    dto::RoomDto {
        room_id: room.id.as_str().to_string(),
        kind: room_kind_str(room.kind).to_string(),
        metadata: room.metadata.clone(),
        member_count: room.member_count(),
        created_by: room.created_by.as_ref().map(|u| u.as_str().to_string()),
        created_at: room.created_at.value(),
    }
}

pub fn presence(member: &MemberPresence) -> dto::PresenceDto {
    dto::PresenceDto {
        user_id: member.user_id.as_str().to_string(),
        user_name: member.display_name.as_str().to_string(),
        user_type: member.role.as_str().to_string(),
        status: member.status.as_ref().map(|s| s.status.clone()),
        activity: member.status.as_ref().and_then(|s| s.activity.clone()),
        updated_at: member.status.as_ref().map(|s| s.updated_at.value()),
    }
}

pub fn room_summary(room: &Room) -> http::RoomSummaryDto {
    http::RoomSummaryDto {
        id: room.id.as_str().to_string(),
        kind: room_kind_str(room.kind).to_string(),
        member_count: room.member_count(),
        created_at: timestamp_to_rfc3339(room.created_at.value()),
    }
}

pub fn room_detail(room: &Room, members: &[MemberPresence]) -> http::RoomDetailDto {
    http::RoomDetailDto {
        id: room.id.as_str().to_string(),
        kind: room_kind_str(room.kind).to_string(),
        members: members
            .iter()
            .map(|m| http::MemberDetailDto {
                user_id: m.user_id.as_str().to_string(),
                user_name: m.display_name.as_str().to_string(),
                user_type: m.role.as_str().to_string(),
                status: m.status.as_ref().map(|s| s.status.clone()),
            })
            .collect(),
        metadata: room.metadata.clone(),
        created_by: room.created_by.as_ref().map(|u| u.as_str().to_string()),
        created_at: timestamp_to_rfc3339(room.created_at.value()),
    }
}
