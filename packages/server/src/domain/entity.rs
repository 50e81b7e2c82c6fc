//! Domain entities
//!
//! Connection / UserSession / Room は Connection Registry が所有し、
//! VoteSession / MessageLog / TeachingSession はルーム単位の状態として
//! RoomStateRepository が所有する。

use std::collections::{BTreeSet, HashMap, VecDeque};

use super::{
    error::VoteError,
    value_object::{
        ConnectionId, DisplayName, MessageContent, RoomId, RoomKind, SessionId, Timestamp, UserId,
        UserRole,
    },
};

/// Default capacity of a room's message log
pub const DEFAULT_MESSAGE_LOG_CAPACITY: usize = 500;

/// Default upper bound for the number of vote options
pub const DEFAULT_MAX_VOTE_OPTIONS: usize = 5;

/// A vote needs something to choose between
pub const MIN_VOTE_OPTIONS: usize = 2;

/// Option ids are single letters, A..=Z
pub const MAX_VOTE_OPTIONS: usize = 26;

/// One live transport session
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub id: ConnectionId,
    /// Bound by the first successful join
    pub user_id: Option<UserId>,
    pub rooms: BTreeSet<RoomId>,
    pub created_at: Timestamp,
    pub last_activity: Timestamp,
}

impl Connection {
    pub fn new(id: ConnectionId, now: Timestamp) -> Self {
        Self {
            id,
            user_id: None,
            rooms: BTreeSet::new(),
            created_at: now,
            last_activity: now,
        }
    }
}

/// Self-reported presence status (online / away / busy ...)
#[derive(Debug, Clone, PartialEq)]
pub struct PresenceStatus {
    pub status: String,
    pub activity: Option<String>,
    pub updated_at: Timestamp,
}

/// Per-user projection of the connection that currently represents the user
#[derive(Debug, Clone, PartialEq)]
pub struct UserSession {
    pub user_id: UserId,
    pub display_name: DisplayName,
    pub role: UserRole,
    pub classroom_id: RoomId,
    pub session_id: Option<SessionId>,
    pub status: Option<PresenceStatus>,
}

impl UserSession {
    pub fn new(
        user_id: UserId,
        display_name: DisplayName,
        role: UserRole,
        classroom_id: RoomId,
        session_id: Option<SessionId>,
    ) -> Self {
        Self {
            user_id,
            display_name,
            role,
            classroom_id,
            session_id,
            status: None,
        }
    }
}

/// Broadcast domain with a member set of user ids
#[derive(Debug, Clone, PartialEq)]
pub struct Room {
    pub id: RoomId,
    pub kind: RoomKind,
    members: BTreeSet<UserId>,
    pub created_at: Timestamp,
    pub metadata: serde_json::Value,
    pub created_by: Option<UserId>,
}

impl Room {
    pub fn new(id: RoomId, kind: RoomKind, created_at: Timestamp) -> Self {
        Self {
            id,
            kind,
            members: BTreeSet::new(),
            created_at,
            metadata: serde_json::Value::Object(serde_json::Map::new()),
            created_by: None,
        }
    }

    /// Returns `true` when the user was not a member yet
    pub fn add_member(&mut self, user_id: UserId) -> bool {
        self.members.insert(user_id)
    }

    /// Returns `true` when the user was a member
    pub fn remove_member(&mut self, user_id: &UserId) -> bool {
        self.members.remove(user_id)
    }

    pub fn has_member(&self, user_id: &UserId) -> bool {
        self.members.contains(user_id)
    }

    pub fn members(&self) -> impl Iterator<Item = &UserId> {
        self.members.iter()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Empty non-classroom rooms are discarded
    pub fn should_be_removed(&self) -> bool {
        self.is_empty() && !self.kind.persists_when_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Chat,
    Answer,
    QuestionRequest,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Chat => "chat",
            MessageKind::Answer => "answer",
            MessageKind::QuestionRequest => "question-request",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub sender_id: UserId,
    pub sender_name: DisplayName,
    pub sender_role: UserRole,
    pub kind: MessageKind,
    pub content: MessageContent,
    pub question_id: Option<String>,
    pub timestamp: Timestamp,
}

/// Bounded append-only message history (oldest entries are evicted first)
#[derive(Debug, Clone)]
pub struct MessageLog {
    capacity: usize,
    entries: VecDeque<ChatMessage>,
}

impl MessageLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_MESSAGE_LOG_CAPACITY)),
        }
    }

    /// Append a message, returning the evicted entry if the log was full
    pub fn push(&mut self, message: ChatMessage) -> Option<ChatMessage> {
        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(message);
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Newest `limit` entries in chronological order
    pub fn recent(&self, limit: usize) -> Vec<ChatMessage> {
        let skip = self.entries.len().saturating_sub(limit);
        self.entries.iter().skip(skip).cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.entries.iter()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VoteOption {
    pub id: String,
    pub text: String,
    pub count: u32,
}

/// A poll scoped to one room
///
/// `ballots` keeps one entry per voter, so the option counts always add up
/// to the number of distinct voters.
#[derive(Debug, Clone, PartialEq)]
pub struct VoteSession {
    pub id: String,
    pub question: String,
    pub options: Vec<VoteOption>,
    pub created_by: UserId,
    pub created_at: Timestamp,
    pub ended_at: Option<Timestamp>,
    pub active: bool,
    ballots: HashMap<UserId, String>,
}

impl VoteSession {
    /// Open a vote; option ids are assigned in order (A, B, C, ...)
    pub fn start(
        question: String,
        option_texts: Vec<String>,
        max_options: usize,
        created_by: UserId,
        now: Timestamp,
    ) -> Result<Self, VoteError> {
        let max_options = max_options.min(MAX_VOTE_OPTIONS);
        if option_texts.len() > max_options {
            return Err(VoteError::TooManyOptions {
                max: max_options,
                given: option_texts.len(),
            });
        }
        if option_texts.len() < MIN_VOTE_OPTIONS {
            return Err(VoteError::NotEnoughOptions {
                min: MIN_VOTE_OPTIONS,
                given: option_texts.len(),
            });
        }

        let options = option_texts
            .into_iter()
            .enumerate()
            .map(|(index, text)| VoteOption {
                id: option_label(index),
                text,
                count: 0,
            })
            .collect();

        Ok(Self {
            id: format!("vote-{}", now.value()),
            question,
            options,
            created_by,
            created_at: now,
            ended_at: None,
            active: true,
            ballots: HashMap::new(),
        })
    }

    /// Record a ballot; a repeated ballot from the same voter replaces the old one
    pub fn submit(&mut self, voter: UserId, option_id: &str) -> Result<(), VoteError> {
        if !self.active {
            return Err(VoteError::VoteEnded);
        }
        let new_index = self
            .option_index(option_id)
            .ok_or_else(|| VoteError::InvalidOption(option_id.to_string()))?;

        if let Some(previous) = self.ballots.get(&voter)
            && let Some(old_index) = self.option_index(previous)
        {
            self.options[old_index].count -= 1;
        }
        self.options[new_index].count += 1;
        self.ballots.insert(voter, self.options[new_index].id.clone());
        Ok(())
    }

    pub fn end(&mut self, now: Timestamp) -> Result<(), VoteError> {
        if !self.active {
            return Err(VoteError::VoteEnded);
        }
        self.active = false;
        self.ended_at = Some(now);
        Ok(())
    }

    pub fn total_votes(&self) -> usize {
        self.ballots.len()
    }

    pub fn choice_of(&self, voter: &UserId) -> Option<&str> {
        self.ballots.get(voter).map(String::as_str)
    }

    fn option_index(&self, option_id: &str) -> Option<usize> {
        self.options.iter().position(|o| o.id == option_id)
    }
}

fn option_label(index: usize) -> String {
    // index < MAX_VOTE_OPTIONS
    char::from(b'A' + index as u8).to_string()
}

/// A teacher-led session inside a classroom (independent of votes)
#[derive(Debug, Clone, PartialEq)]
pub struct TeachingSession {
    pub id: SessionId,
    pub classroom_id: RoomId,
    pub name: String,
    pub teacher_id: UserId,
    pub started_at: Timestamp,
    pub ended_at: Option<Timestamp>,
    pub active: bool,
}
