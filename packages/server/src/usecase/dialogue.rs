//! UseCase: チャット・回答・質問リクエスト・入力中表示
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DialogueUseCase の send_message / submit_answer / request_question / typing / history
//!
//! ### なぜこのテストが必要か
//! - クラスルームに参加していない接続からの送信が拒否されることを保証
//! - sessionId の有無で配信先のルーム（とメッセージ履歴）が切り替わることを保証
//! - 外部フック（永続化・回答分析）が呼ばれることを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：送信者以外への配信と履歴への追加
//! - 異常系：未参加の接続からの送信
//! - エッジケース：入力中表示は履歴に残らない

use std::sync::Arc;

use serde::Serialize;

use crate::domain::{
    ChatMessage, ClassroomHooks, ConnectionId, ConnectionRegistry, MessageContent, MessageKind,
    RoomId, RoomStateRepository, SessionId,
};
use crate::infrastructure::dto::{
    conversion,
    websocket::{MessageDto, ServerEvent, UserTypingDto},
};

use super::error::CoordinatorError;
use super::fanout::Fanout;
use super::guard::require_member_of_target;

/// `request-question` で topic が省略されたときの本文
pub const DEFAULT_QUESTION_TOPIC: &str = "next question";

#[derive(Debug, Clone, PartialEq)]
pub struct SendMessageRequest {
    pub classroom_id: RoomId,
    pub session_id: Option<SessionId>,
    pub content: MessageContent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmitAnswerRequest {
    pub classroom_id: RoomId,
    pub session_id: SessionId,
    pub question_id: String,
    pub answer: MessageContent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestQuestionRequest {
    pub classroom_id: RoomId,
    pub session_id: Option<SessionId>,
    pub topic: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypingRequest {
    pub classroom_id: RoomId,
    pub session_id: SessionId,
    pub question_id: String,
    pub is_typing: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageHistoryRequest {
    pub classroom_id: RoomId,
    pub session_id: Option<SessionId>,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePosted {
    pub room_id: String,
    pub timestamp: i64,
    pub delivered: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageHistory {
    pub room_id: String,
    pub messages: Vec<MessageDto>,
}

/// 配信先: sessionId があればセッションルーム、無ければクラスルーム
fn target_room(classroom_id: &RoomId, session_id: Option<&SessionId>) -> RoomId {
    match session_id {
        Some(session_id) => RoomId::for_session(session_id),
        None => classroom_id.clone(),
    }
}

/// チャット・回答のユースケース
pub struct DialogueUseCase {
    registry: Arc<dyn ConnectionRegistry>,
    room_state: Arc<dyn RoomStateRepository>,
    hooks: Arc<dyn ClassroomHooks>,
    fanout: Arc<Fanout>,
}

impl DialogueUseCase {
    pub fn new(
        registry: Arc<dyn ConnectionRegistry>,
        room_state: Arc<dyn RoomStateRepository>,
        hooks: Arc<dyn ClassroomHooks>,
        fanout: Arc<Fanout>,
    ) -> Self {
        Self {
            registry,
            room_state,
            hooks,
            fanout,
        }
    }

    pub async fn send_message(
        &self,
        connection_id: &ConnectionId,
        request: SendMessageRequest,
    ) -> Result<MessagePosted, CoordinatorError> {
        let room_id = target_room(&request.classroom_id, request.session_id.as_ref());
        let message = self
            .compose(
                connection_id,
                &request.classroom_id,
                &room_id,
                MessageKind::Chat,
                request.content,
                None,
            )
            .await?;

        self.room_state
            .append_message(&room_id, message.clone())
            .await;
        self.hooks.persist_message(&room_id, &message).await;

        let event = ServerEvent::NewMessage(conversion::message(&room_id, &message));
        let delivered = self
            .fanout
            .to_room(&room_id, &event, Some(connection_id))
            .await;
        Ok(posted(&room_id, &message, delivered))
    }

    pub async fn submit_answer(
        &self,
        connection_id: &ConnectionId,
        request: SubmitAnswerRequest,
    ) -> Result<MessagePosted, CoordinatorError> {
        let room_id = RoomId::for_session(&request.session_id);
        let message = self
            .compose(
                connection_id,
                &request.classroom_id,
                &room_id,
                MessageKind::Answer,
                request.answer,
                Some(request.question_id),
            )
            .await?;

        self.room_state
            .append_message(&room_id, message.clone())
            .await;
        self.hooks.analyze_answer(&room_id, &message).await;

        let event = ServerEvent::AnswerSubmitted(conversion::message(&room_id, &message));
        let delivered = self
            .fanout
            .to_room(&room_id, &event, Some(connection_id))
            .await;
        tracing::debug!(
            "Answer from '{}' recorded in {}",
            message.sender_id,
            room_id
        );
        Ok(posted(&room_id, &message, delivered))
    }

    pub async fn request_question(
        &self,
        connection_id: &ConnectionId,
        request: RequestQuestionRequest,
    ) -> Result<MessagePosted, CoordinatorError> {
        let room_id = target_room(&request.classroom_id, request.session_id.as_ref());
        let topic = request
            .topic
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_QUESTION_TOPIC.to_string());
        let message = self
            .compose(
                connection_id,
                &request.classroom_id,
                &room_id,
                MessageKind::QuestionRequest,
                MessageContent::new(topic)?,
                None,
            )
            .await?;

        self.room_state
            .append_message(&room_id, message.clone())
            .await;

        let event = ServerEvent::QuestionRequested(conversion::message(&room_id, &message));
        let delivered = self
            .fanout
            .to_room(&room_id, &event, Some(connection_id))
            .await;
        Ok(posted(&room_id, &message, delivered))
    }

    /// 入力中表示。履歴には残さない
    pub async fn typing(
        &self,
        connection_id: &ConnectionId,
        request: TypingRequest,
    ) -> Result<MessagePosted, CoordinatorError> {
        let room_id = RoomId::for_session(&request.session_id);
        let sender = require_member_of_target(
            self.registry.as_ref(),
            connection_id,
            &request.classroom_id,
            &room_id,
        )
        .await?;
        let now = self.fanout.now();

        let event = ServerEvent::UserTyping(UserTypingDto {
            classroom_id: request.classroom_id.as_str().to_string(),
            session_id: request.session_id.as_str().to_string(),
            question_id: request.question_id,
            user_id: sender.user_id.as_str().to_string(),
            user_name: sender.display_name.as_str().to_string(),
            is_typing: request.is_typing,
            timestamp: now.value(),
        });
        let delivered = self
            .fanout
            .to_room(&room_id, &event, Some(connection_id))
            .await;
        Ok(MessagePosted {
            room_id: room_id.into_string(),
            timestamp: now.value(),
            delivered,
        })
    }

    /// 新しい順に最大 `limit` 件（時系列順で返す）
    pub async fn history(
        &self,
        connection_id: &ConnectionId,
        request: MessageHistoryRequest,
    ) -> Result<MessageHistory, CoordinatorError> {
        let room_id = target_room(&request.classroom_id, request.session_id.as_ref());
        require_member_of_target(
            self.registry.as_ref(),
            connection_id,
            &request.classroom_id,
            &room_id,
        )
        .await?;
        let messages = self
            .room_state
            .recent_messages(&room_id, request.limit)
            .await
            .iter()
            .map(|m| conversion::message(&room_id, m))
            .collect();
        Ok(MessageHistory {
            room_id: room_id.into_string(),
            messages,
        })
    }

    async fn compose(
        &self,
        connection_id: &ConnectionId,
        classroom_id: &RoomId,
        room_id: &RoomId,
        kind: MessageKind,
        content: MessageContent,
        question_id: Option<String>,
    ) -> Result<ChatMessage, CoordinatorError> {
        let sender =
            require_member_of_target(self.registry.as_ref(), connection_id, classroom_id, room_id)
                .await?;
        Ok(ChatMessage {
            sender_id: sender.user_id,
            sender_name: sender.display_name,
            sender_role: sender.role,
            kind,
            content,
            question_id,
            timestamp: self.fanout.now(),
        })
    }
}

fn posted(room_id: &RoomId, message: &ChatMessage, delivered: usize) -> MessagePosted {
    MessagePosted {
        room_id: room_id.as_str().to_string(),
        timestamp: message.timestamp.value(),
        delivered,
    }
}
