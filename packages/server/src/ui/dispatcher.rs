//! Event dispatcher.
//!
//! 1 フレームを受け取り、イベント名でユースケースへ振り分け、結果を ack に変換する。
//! どのエラーも ack として返すだけで、接続は閉じない。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - handle_text() によるフレームの振り分けと ack の生成
//!
//! ### なぜこのテストが必要か
//! - 未知のイベント・壊れたフレーム・検証エラーが ack で返り、状態を変えないことを保証
//! - ackId が無いフレームには ack を返さないことを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：join-classroom、heartbeat
//! - 異常系：未知のイベント、必須項目の欠落、JSON として壊れたフレーム
//! - エッジケース：event の無いオブジェクト（ackId だけ取り出せる）

use serde::Serialize;
use serde_json::Value;

use crate::{
    config::DEFAULT_HISTORY_LIMIT,
    domain::ConnectionId,
    infrastructure::dto::websocket::{
        AckFrame, AckPayload, BroadcastPayload, ChangeLevelPayload, CreateRoomPayload,
        EndSessionPayload, EventName, InboundFrame, JoinClassroomPayload, LeaveClassroomPayload,
        MessageHistoryPayload, RequestQuestionPayload, RoomRefPayload, SendMessagePayload,
        StartSessionPayload, StartVotePayload, SubmitAnswerPayload, SubmitVotePayload,
        TypingPayload, UpdateRoomPayload, UpdateStatusPayload, VoteRefPayload,
    },
    usecase::{
        BroadcastRequest, ChangeLevelRequest, CoordinatorError, CreateRoomRequest,
        EndSessionRequest, JoinClassroomRequest, LeaveClassroomRequest, RequestQuestionRequest,
        SendMessageRequest, StartSessionRequest, StartVoteRequest, SubmitAnswerRequest,
        SubmitVoteRequest, TypingRequest, UpdateRoomRequest, UpdateStatusRequest,
    },
};

use super::{
    request::{history_request, parse, room_ref, vote_ref},
    state::AppState,
};

/// 受信したテキストフレームを処理する
///
/// フレームごとに最終アクティビティを更新し、`ackId` があれば結果を ack として返送する。
pub async fn handle_text(state: &AppState, connection_id: &ConnectionId, text: &str) {
    state
        .connect_participant_usecase
        .touch(connection_id)
        .await;

    let frame = match serde_json::from_str::<InboundFrame>(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!("Malformed frame from '{}': {}", connection_id, e);
            if let Some(ack_id) = recover_ack_id(text) {
                let error = CoordinatorError::Validation(format!("Malformed frame: {}", e));
                reply(state, connection_id, ack_id, Err(error)).await;
            }
            return;
        }
    };

    let InboundFrame {
        event,
        payload,
        ack_id,
    } = frame;

    let result = match EventName::parse(&event) {
        Some(name) => {
            tracing::debug!("'{}' -> {}", connection_id, name.as_str());
            route(state, connection_id, name, payload).await
        }
        None => Err(CoordinatorError::UnknownEvent(event.clone())),
    };

    if let Err(e) = &result {
        tracing::info!(
            "'{}' from '{}' rejected: {} ({})",
            event,
            connection_id,
            e,
            e.code()
        );
    }

    if let Some(ack_id) = ack_id {
        reply(state, connection_id, ack_id, result).await;
    }
}

/// JSON としては読めるが `InboundFrame` にならないフレームから ackId を取り出す
fn recover_ack_id(text: &str) -> Option<String> {
    let value: Value = serde_json::from_str(text).ok()?;
    value.get("ackId")?.as_str().map(str::to_string)
}

async fn reply(
    state: &AppState,
    connection_id: &ConnectionId,
    ack_id: String,
    result: Result<Value, CoordinatorError>,
) {
    let payload = match result {
        Ok(data) => AckPayload::ok(data),
        Err(e) => AckPayload::err(e.code(), e.to_string()),
    };
    let frame = match serde_json::to_string(&AckFrame::new(ack_id, payload)) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::error!("Failed to encode ack for '{}': {}", connection_id, e);
            return;
        }
    };
    state
        .connect_participant_usecase
        .push_ack(connection_id, &frame)
        .await;
}

fn respond<T: Serialize>(result: Result<T, CoordinatorError>) -> Result<Value, CoordinatorError> {
    let data = result?;
    serde_json::to_value(data).map_err(|e| CoordinatorError::Transport(e.to_string()))
}

async fn route(
    state: &AppState,
    connection_id: &ConnectionId,
    event: EventName,
    payload: Value,
) -> Result<Value, CoordinatorError> {
    match event {
        EventName::JoinClassroom => {
            let request = JoinClassroomRequest::try_from(parse::<JoinClassroomPayload>(payload)?)?;
            respond(
                state
                    .join_classroom_usecase
                    .execute(connection_id, request)
                    .await,
            )
        }
        EventName::LeaveClassroom => {
            let request =
                LeaveClassroomRequest::try_from(parse::<LeaveClassroomPayload>(payload)?)?;
            respond(
                state
                    .leave_classroom_usecase
                    .execute(connection_id, request)
                    .await,
            )
        }
        EventName::SubmitAnswer => {
            let request = SubmitAnswerRequest::try_from(parse::<SubmitAnswerPayload>(payload)?)?;
            respond(
                state
                    .dialogue_usecase
                    .submit_answer(connection_id, request)
                    .await,
            )
        }
        EventName::Typing => {
            let request = TypingRequest::try_from(parse::<TypingPayload>(payload)?)?;
            respond(state.dialogue_usecase.typing(connection_id, request).await)
        }
        EventName::RequestQuestion => {
            let request =
                RequestQuestionRequest::try_from(parse::<RequestQuestionPayload>(payload)?)?;
            respond(
                state
                    .dialogue_usecase
                    .request_question(connection_id, request)
                    .await,
            )
        }
        EventName::SendMessage => {
            let request = SendMessageRequest::try_from(parse::<SendMessagePayload>(payload)?)?;
            respond(
                state
                    .dialogue_usecase
                    .send_message(connection_id, request)
                    .await,
            )
        }
        EventName::GetMessageHistory => {
            let request = history_request(
                parse::<MessageHistoryPayload>(payload)?,
                DEFAULT_HISTORY_LIMIT,
                state.config.message_log_capacity,
            )?;
            respond(state.dialogue_usecase.history(connection_id, request).await)
        }
        EventName::StartSession => {
            let request = StartSessionRequest::try_from(parse::<StartSessionPayload>(payload)?)?;
            respond(
                state
                    .teacher_control_usecase
                    .start_session(connection_id, request)
                    .await,
            )
        }
        EventName::EndSession => {
            let request = EndSessionRequest::try_from(parse::<EndSessionPayload>(payload)?)?;
            respond(
                state
                    .teacher_control_usecase
                    .end_session(connection_id, request)
                    .await,
            )
        }
        EventName::ChangeLevel => {
            let request = ChangeLevelRequest::try_from(parse::<ChangeLevelPayload>(payload)?)?;
            respond(
                state
                    .teacher_control_usecase
                    .change_level(connection_id, request)
                    .await,
            )
        }
        EventName::StartVote => {
            let request = StartVoteRequest::try_from(parse::<StartVotePayload>(payload)?)?;
            respond(state.vote_usecase.start(connection_id, request).await)
        }
        EventName::SubmitVote => {
            let request = SubmitVoteRequest::try_from(parse::<SubmitVotePayload>(payload)?)?;
            respond(state.vote_usecase.submit(connection_id, request).await)
        }
        EventName::EndVote => {
            let session_id = vote_ref(parse::<VoteRefPayload>(payload)?)?;
            respond(state.vote_usecase.end(connection_id, session_id).await)
        }
        EventName::GetVoteResults => {
            let session_id = vote_ref(parse::<VoteRefPayload>(payload)?)?;
            respond(state.vote_usecase.results(connection_id, session_id).await)
        }
        EventName::CreateRoom => {
            let request = CreateRoomRequest::try_from(parse::<CreateRoomPayload>(payload)?)?;
            respond(
                state
                    .room_lifecycle_usecase
                    .create(connection_id, request)
                    .await,
            )
        }
        EventName::JoinRoom => {
            let room_id = room_ref(parse::<RoomRefPayload>(payload)?)?;
            respond(
                state
                    .room_lifecycle_usecase
                    .join(connection_id, room_id)
                    .await,
            )
        }
        EventName::LeaveRoom => {
            let room_id = room_ref(parse::<RoomRefPayload>(payload)?)?;
            respond(
                state
                    .room_lifecycle_usecase
                    .leave(connection_id, room_id)
                    .await,
            )
        }
        EventName::UpdateRoom => {
            let request = UpdateRoomRequest::try_from(parse::<UpdateRoomPayload>(payload)?)?;
            respond(
                state
                    .room_lifecycle_usecase
                    .update(connection_id, request)
                    .await,
            )
        }
        EventName::DeleteRoom => {
            let room_id = room_ref(parse::<RoomRefPayload>(payload)?)?;
            respond(
                state
                    .room_lifecycle_usecase
                    .delete(connection_id, room_id)
                    .await,
            )
        }
        EventName::UpdateStatus => {
            let request = UpdateStatusRequest::try_from(parse::<UpdateStatusPayload>(payload)?)?;
            respond(
                state
                    .status_usecase
                    .update_status(connection_id, request)
                    .await,
            )
        }
        EventName::GetRoomPresence => {
            let room_id = room_ref(parse::<RoomRefPayload>(payload)?)?;
            respond(
                state
                    .status_usecase
                    .room_presence(connection_id, room_id)
                    .await,
            )
        }
        EventName::Broadcast => {
            let request = BroadcastRequest::try_from(parse::<BroadcastPayload>(payload)?)?;
            respond(
                state
                    .broadcast_usecase
                    .execute(connection_id, request)
                    .await,
            )
        }
        EventName::Heartbeat => respond(Ok(state
            .connect_participant_usecase
            .heartbeat(connection_id)
            .await)),
    }
}
