//! Payload normalization.
//!
//! 受信フレームの `payload` を寛容な DTO（全項目 `Option`）として読み取り、
//! ユースケースに渡す厳密なリクエスト型へ変換する。必須項目の欠落・空文字は
//! 全て `ValidationError`（"Missing required fields"）となり、ユースケースは実行されない。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - 各 `*Payload` → リクエスト型の変換
//!
//! ### なぜこのテストが必要か
//! - 欠落・空文字・型違いが一律に ValidationError になることを保証
//! - 省略可能な項目のデフォルト値（履歴件数・メタデータ）を保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：全項目が揃ったペイロード
//! - 異常系：必須項目の欠落、空白のみの文字列、不正な userType / target
//! - エッジケース：payload 自体が null、数値の level、上限を超える limit

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::{
    domain::{DisplayName, MessageContent, RoomId, SessionId, UserId, UserRole},
    infrastructure::dto::websocket::{
        BroadcastPayload, ChangeLevelPayload, CreateRoomPayload, EndSessionPayload,
        JoinClassroomPayload, LeaveClassroomPayload, MessageHistoryPayload,
        RequestQuestionPayload, RoomRefPayload, SendMessagePayload, StartSessionPayload,
        StartVotePayload, SubmitAnswerPayload, SubmitVotePayload, TypingPayload,
        UpdateRoomPayload, UpdateStatusPayload, VoteRefPayload,
    },
    usecase::{
        BroadcastRequest, BroadcastTarget, ChangeLevelRequest, CoordinatorError,
        CreateRoomRequest, EndSessionRequest, JoinClassroomRequest, LeaveClassroomRequest,
        MessageHistoryRequest, RequestQuestionRequest, SendMessageRequest, StartSessionRequest,
        StartVoteRequest, SubmitAnswerRequest, SubmitVoteRequest, TypingRequest,
        UpdateRoomRequest, UpdateStatusRequest,
    },
};

/// `payload` を DTO として読み取る。`null` や省略は全項目 `None` として扱う
pub fn parse<T>(payload: Value) -> Result<T, CoordinatorError>
where
    T: DeserializeOwned + Default,
{
    if payload.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(payload)
        .map_err(|e| CoordinatorError::Validation(format!("Malformed payload: {}", e)))
}

fn required(value: Option<String>) -> Result<String, CoordinatorError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(CoordinatorError::missing_fields()),
    }
}

/// 空文字は省略と同じ扱い
fn optional(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn optional_session(value: Option<String>) -> Result<Option<SessionId>, CoordinatorError> {
    optional(value).map(SessionId::new).transpose().map_err(Into::into)
}

/// 参加先のクラスルーム。`session:` はセッションルーム用に予約されている
fn classroom(value: Option<String>) -> Result<RoomId, CoordinatorError> {
    let room_id = RoomId::new(required(value)?)?;
    if room_id.is_session_room() {
        return Err(CoordinatorError::reserved_room_id());
    }
    Ok(room_id)
}

fn metadata(value: Option<Value>) -> Result<Map<String, Value>, CoordinatorError> {
    match value {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(_) => Err(CoordinatorError::Validation(
            "metadata must be an object".to_string(),
        )),
    }
}

impl TryFrom<JoinClassroomPayload> for JoinClassroomRequest {
    type Error = CoordinatorError;

    fn try_from(p: JoinClassroomPayload) -> Result<Self, Self::Error> {
        Ok(Self {
            classroom_id: classroom(p.classroom_id)?,
            user_id: UserId::new(required(p.user_id)?)?,
            user_name: DisplayName::new(required(p.user_name)?)?,
            role: UserRole::try_from(required(p.user_type)?)?,
            session_id: optional_session(p.session_id)?,
        })
    }
}

impl TryFrom<LeaveClassroomPayload> for LeaveClassroomRequest {
    type Error = CoordinatorError;

    fn try_from(p: LeaveClassroomPayload) -> Result<Self, Self::Error> {
        Ok(Self {
            classroom_id: RoomId::new(required(p.classroom_id)?)?,
            user_id: UserId::new(required(p.user_id)?)?,
            role: UserRole::try_from(required(p.user_type)?)?,
        })
    }
}

impl TryFrom<SubmitAnswerPayload> for SubmitAnswerRequest {
    type Error = CoordinatorError;

    fn try_from(p: SubmitAnswerPayload) -> Result<Self, Self::Error> {
        Ok(Self {
            classroom_id: RoomId::new(required(p.classroom_id)?)?,
            session_id: SessionId::new(required(p.session_id)?)?,
            question_id: required(p.question_id)?,
            answer: MessageContent::new(required(p.answer)?)?,
        })
    }
}

impl TryFrom<TypingPayload> for TypingRequest {
    type Error = CoordinatorError;

    fn try_from(p: TypingPayload) -> Result<Self, Self::Error> {
        Ok(Self {
            classroom_id: RoomId::new(required(p.classroom_id)?)?,
            session_id: SessionId::new(required(p.session_id)?)?,
            question_id: required(p.question_id)?,
            is_typing: p.is_typing.ok_or_else(CoordinatorError::missing_fields)?,
        })
    }
}

impl TryFrom<RequestQuestionPayload> for RequestQuestionRequest {
    type Error = CoordinatorError;

    fn try_from(p: RequestQuestionPayload) -> Result<Self, Self::Error> {
        Ok(Self {
            classroom_id: RoomId::new(required(p.classroom_id)?)?,
            session_id: optional_session(p.session_id)?,
            topic: optional(p.topic),
        })
    }
}

impl TryFrom<SendMessagePayload> for SendMessageRequest {
    type Error = CoordinatorError;

    fn try_from(p: SendMessagePayload) -> Result<Self, Self::Error> {
        Ok(Self {
            classroom_id: RoomId::new(required(p.classroom_id)?)?,
            session_id: optional_session(p.session_id)?,
            content: MessageContent::new(required(p.content)?)?,
        })
    }
}

/// `limit` の省略時は `default_limit`、指定時は 1 以上 `capacity` 以下に丸める
pub fn history_request(
    p: MessageHistoryPayload,
    default_limit: usize,
    capacity: usize,
) -> Result<MessageHistoryRequest, CoordinatorError> {
    let limit = p.limit.unwrap_or(default_limit).min(capacity).max(1);
    Ok(MessageHistoryRequest {
        classroom_id: RoomId::new(required(p.classroom_id)?)?,
        session_id: optional_session(p.session_id)?,
        limit,
    })
}

impl TryFrom<StartSessionPayload> for StartSessionRequest {
    type Error = CoordinatorError;

    fn try_from(p: StartSessionPayload) -> Result<Self, Self::Error> {
        Ok(Self {
            classroom_id: RoomId::new(required(p.classroom_id)?)?,
            session_name: optional(p.session_name),
        })
    }
}

impl TryFrom<EndSessionPayload> for EndSessionRequest {
    type Error = CoordinatorError;

    fn try_from(p: EndSessionPayload) -> Result<Self, Self::Error> {
        Ok(Self {
            classroom_id: RoomId::new(required(p.classroom_id)?)?,
            session_id: optional_session(p.session_id)?,
        })
    }
}

impl TryFrom<ChangeLevelPayload> for ChangeLevelRequest {
    type Error = CoordinatorError;

    fn try_from(p: ChangeLevelPayload) -> Result<Self, Self::Error> {
        let level = match p.level {
            Some(Value::String(s)) => required(Some(s))?,
            Some(Value::Number(n)) => n.to_string(),
            None | Some(Value::Null) => return Err(CoordinatorError::missing_fields()),
            Some(other) => {
                return Err(CoordinatorError::Validation(format!(
                    "level must be a string or a number, got {}",
                    other
                )));
            }
        };
        Ok(Self {
            classroom_id: RoomId::new(required(p.classroom_id)?)?,
            level,
        })
    }
}

impl TryFrom<StartVotePayload> for StartVoteRequest {
    type Error = CoordinatorError;

    fn try_from(p: StartVotePayload) -> Result<Self, Self::Error> {
        Ok(Self {
            session_id: SessionId::new(required(p.session_id)?)?,
            question: required(p.question)?,
            options: p.options.ok_or_else(CoordinatorError::missing_fields)?,
        })
    }
}

impl TryFrom<SubmitVotePayload> for SubmitVoteRequest {
    type Error = CoordinatorError;

    fn try_from(p: SubmitVotePayload) -> Result<Self, Self::Error> {
        Ok(Self {
            session_id: SessionId::new(required(p.session_id)?)?,
            option_id: required(p.option_id)?,
        })
    }
}

/// end-vote / get-vote-results
pub fn vote_ref(p: VoteRefPayload) -> Result<SessionId, CoordinatorError> {
    Ok(SessionId::new(required(p.session_id)?)?)
}

impl TryFrom<CreateRoomPayload> for CreateRoomRequest {
    type Error = CoordinatorError;

    fn try_from(p: CreateRoomPayload) -> Result<Self, Self::Error> {
        Ok(Self {
            room_id: optional(p.room_id).map(RoomId::new).transpose()?,
            name: optional(p.name),
            metadata: metadata(p.metadata)?,
        })
    }
}

/// join-room / leave-room / delete-room / get-room-presence
pub fn room_ref(p: RoomRefPayload) -> Result<RoomId, CoordinatorError> {
    Ok(RoomId::new(required(p.room_id)?)?)
}

impl TryFrom<UpdateRoomPayload> for UpdateRoomRequest {
    type Error = CoordinatorError;

    fn try_from(p: UpdateRoomPayload) -> Result<Self, Self::Error> {
        if p.metadata.is_none() {
            return Err(CoordinatorError::missing_fields());
        }
        Ok(Self {
            room_id: RoomId::new(required(p.room_id)?)?,
            metadata: metadata(p.metadata)?,
        })
    }
}

impl TryFrom<UpdateStatusPayload> for UpdateStatusRequest {
    type Error = CoordinatorError;

    fn try_from(p: UpdateStatusPayload) -> Result<Self, Self::Error> {
        Ok(Self {
            status: required(p.status)?,
            activity: optional(p.activity),
        })
    }
}

impl TryFrom<BroadcastPayload> for BroadcastRequest {
    type Error = CoordinatorError;

    fn try_from(p: BroadcastPayload) -> Result<Self, Self::Error> {
        let target = required(p.target)?;
        let ids = || -> Result<Vec<String>, CoordinatorError> {
            match p.ids.clone() {
                Some(ids) if !ids.is_empty() => Ok(ids),
                _ => Err(CoordinatorError::missing_fields()),
            }
        };
        let target = match target.as_str() {
            "all" => BroadcastTarget::All,
            "classrooms" => BroadcastTarget::Classrooms(
                ids()?
                    .into_iter()
                    .map(RoomId::new)
                    .collect::<Result<_, _>>()?,
            ),
            "users" => BroadcastTarget::Users(
                ids()?
                    .into_iter()
                    .map(UserId::new)
                    .collect::<Result<_, _>>()?,
            ),
            "sessions" => BroadcastTarget::Sessions(
                ids()?
                    .into_iter()
                    .map(SessionId::new)
                    .collect::<Result<_, _>>()?,
            ),
            other => {
                return Err(CoordinatorError::Validation(format!(
                    "Unknown broadcast target '{}'",
                    other
                )));
            }
        };
        Ok(Self {
            target,
            event: required(p.event)?,
            data: p.data.unwrap_or(Value::Null),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_join_payload_with_blank_user_name_is_missing_fields() {
        // テスト項目: 空白のみの userName は欠落として扱われる
        // given (前提条件):
        let payload = json!({
            "classroomId": "classroom-1",
            "userId": "s1",
            "userName": "   ",
            "userType": "student"
        });

        // when (操作):
        let result = JoinClassroomRequest::try_from(
            parse::<JoinClassroomPayload>(payload).unwrap(),
        );

        // then (期待する結果):
        let err = result.unwrap_err();
        assert_eq!(err.code(), "ValidationError");
        assert_eq!(err.to_string(), "Missing required fields");
    }

    #[test]
    fn test_join_payload_with_session_room_id_is_rejected() {
        // テスト項目: session: で始まる classroomId は予約済みとして ValidationError になる
        // given (前提条件):
        let payload = json!({
            "classroomId": "session:session-1",
            "userId": "s1",
            "userName": "Sam",
            "userType": "student"
        });

        // when (操作):
        let result = JoinClassroomRequest::try_from(
            parse::<JoinClassroomPayload>(payload).unwrap(),
        );

        // then (期待する結果):
        let err = result.unwrap_err();
        assert_eq!(err.code(), "ValidationError");
        assert!(err.to_string().contains("session:"));
    }

    #[test]
    fn test_join_payload_resolves_role_and_optional_session() {
        // テスト項目: userType が役割に変換され、空の sessionId は省略扱いになる
        // given (前提条件):
        let payload = json!({
            "classroomId": "classroom-1",
            "userId": "t1",
            "userName": "Ms. T",
            "userType": "teacher",
            "sessionId": ""
        });

        // when (操作):
        let request =
            JoinClassroomRequest::try_from(parse::<JoinClassroomPayload>(payload).unwrap())
                .unwrap();

        // then (期待する結果):
        assert_eq!(request.role, UserRole::Teacher);
        assert_eq!(request.session_id, None);
        assert_eq!(request.classroom_id.as_str(), "classroom-1");
    }

    #[test]
    fn test_unknown_user_type_is_validation_error() {
        // テスト項目: 未知の userType は ValidationError
        // given (前提条件):
        let payload = json!({
            "classroomId": "classroom-1",
            "userId": "x",
            "userName": "X",
            "userType": "principal"
        });

        // when (操作):
        let result =
            JoinClassroomRequest::try_from(parse::<JoinClassroomPayload>(payload).unwrap());

        // then (期待する結果):
        assert_eq!(result.unwrap_err().code(), "ValidationError");
    }

    #[test]
    fn test_null_payload_reads_as_all_missing() {
        // テスト項目: payload が null でもパースは成功し、変換で欠落が検出される
        // given (前提条件):

        // when (操作):
        let parsed = parse::<StartVotePayload>(Value::Null).unwrap();
        let result = StartVoteRequest::try_from(parsed);

        // then (期待する結果):
        assert_eq!(result.unwrap_err().code(), "ValidationError");
    }

    #[test]
    fn test_wrong_field_type_is_malformed_payload() {
        // テスト項目: 型の合わない項目は ValidationError（Malformed payload）
        // given (前提条件):
        let payload = json!({"sessionId": 7, "optionId": "A"});

        // when (操作):
        let result = parse::<SubmitVotePayload>(payload);

        // then (期待する結果):
        let err = result.unwrap_err();
        assert_eq!(err.code(), "ValidationError");
        assert!(err.to_string().starts_with("Malformed payload"));
    }

    #[test]
    fn test_level_accepts_numbers_and_labels() {
        // テスト項目: level は数値・文字列のどちらでも受け付け、真偽値は拒否する
        // given (前提条件):
        let numeric = ChangeLevelPayload {
            classroom_id: Some("classroom-1".to_string()),
            level: Some(json!(3)),
        };
        let label = ChangeLevelPayload {
            classroom_id: Some("classroom-1".to_string()),
            level: Some(json!("advanced")),
        };
        let boolean = ChangeLevelPayload {
            classroom_id: Some("classroom-1".to_string()),
            level: Some(json!(true)),
        };

        // when (操作):
        let numeric = ChangeLevelRequest::try_from(numeric).unwrap();
        let label = ChangeLevelRequest::try_from(label).unwrap();
        let boolean = ChangeLevelRequest::try_from(boolean);

        // then (期待する結果):
        assert_eq!(numeric.level, "3");
        assert_eq!(label.level, "advanced");
        assert_eq!(boolean.unwrap_err().code(), "ValidationError");
    }

    #[test]
    fn test_history_limit_defaults_and_is_capped() {
        // テスト項目: limit の省略時はデフォルト、容量を超える指定は容量に丸められる
        // given (前提条件):
        let omitted = MessageHistoryPayload {
            classroom_id: Some("classroom-1".to_string()),
            session_id: None,
            limit: None,
        };
        let oversized = MessageHistoryPayload {
            classroom_id: Some("classroom-1".to_string()),
            session_id: Some("session-1".to_string()),
            limit: Some(10_000),
        };

        // when (操作):
        let omitted = history_request(omitted, 50, 500).unwrap();
        let oversized = history_request(oversized, 50, 500).unwrap();

        // then (期待する結果):
        assert_eq!(omitted.limit, 50);
        assert_eq!(oversized.limit, 500);
        assert_eq!(oversized.session_id.unwrap().as_str(), "session-1");
    }

    #[test]
    fn test_room_metadata_must_be_an_object() {
        // テスト項目: metadata はオブジェクトのみ受け付け、省略時は空になる
        // given (前提条件):
        let omitted = CreateRoomPayload {
            room_id: None,
            name: Some("group A".to_string()),
            metadata: None,
        };
        let array = UpdateRoomPayload {
            room_id: Some("breakout-1".to_string()),
            metadata: Some(json!([1, 2])),
        };

        // when (操作):
        let omitted = CreateRoomRequest::try_from(omitted).unwrap();
        let array = UpdateRoomRequest::try_from(array);

        // then (期待する結果):
        assert!(omitted.metadata.is_empty());
        assert_eq!(omitted.room_id, None);
        assert_eq!(array.unwrap_err().code(), "ValidationError");
    }

    #[test]
    fn test_broadcast_target_requires_ids_except_all() {
        // テスト項目: all 以外の宛先は ids が必須、未知の宛先は拒否される
        // given (前提条件):
        let all = BroadcastPayload {
            target: Some("all".to_string()),
            ids: None,
            event: Some("quiz-time".to_string()),
            data: None,
        };
        let users_without_ids = BroadcastPayload {
            target: Some("users".to_string()),
            ids: Some(vec![]),
            event: Some("quiz-time".to_string()),
            data: None,
        };
        let unknown = BroadcastPayload {
            target: Some("planets".to_string()),
            ids: Some(vec!["mars".to_string()]),
            event: Some("quiz-time".to_string()),
            data: None,
        };

        // when (操作):
        let all = BroadcastRequest::try_from(all).unwrap();
        let users_without_ids = BroadcastRequest::try_from(users_without_ids);
        let unknown = BroadcastRequest::try_from(unknown);

        // then (期待する結果):
        assert_eq!(all.target, BroadcastTarget::All);
        assert_eq!(all.data, Value::Null);
        assert_eq!(
            users_without_ids.unwrap_err().to_string(),
            "Missing required fields"
        );
        assert_eq!(unknown.unwrap_err().code(), "ValidationError");
    }
}
