//! UseCase: 投票
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - VoteUseCase の start / submit / end / results
//!
//! ### なぜこのテストが必要か
//! - 選択肢ごとの得票数の合計が投票者数と一致する（再投票は上書き）ことを保証
//! - 選択肢の数の上限・下限、終了済みの投票への投票が拒否されることを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：開始・投票・終了と、セッションルームへの通知
//! - 異常系：生徒による開始、選択肢が多すぎる/少なすぎる、終了後の投票、存在しない選択肢
//! - エッジケース：同じ生徒の再投票、終了した投票の置き換え

use std::sync::Arc;

use crate::domain::{
    ConnectionId, ConnectionRegistry, RoomId, RoomStateRepository, SessionId, VoteError,
    VoteSession,
};
use crate::infrastructure::dto::{
    conversion,
    websocket::{ServerEvent, VoteResultsDto},
};

use super::error::CoordinatorError;
use super::fanout::Fanout;
use super::guard::{require_member, require_teacher_of};

#[derive(Debug, Clone, PartialEq)]
pub struct StartVoteRequest {
    pub session_id: SessionId,
    pub question: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmitVoteRequest {
    pub session_id: SessionId,
    pub option_id: String,
}

/// 投票のユースケース（投票はセッションルーム `session:<id>` 単位）
pub struct VoteUseCase {
    registry: Arc<dyn ConnectionRegistry>,
    room_state: Arc<dyn RoomStateRepository>,
    fanout: Arc<Fanout>,
    max_options: usize,
}

impl VoteUseCase {
    pub fn new(
        registry: Arc<dyn ConnectionRegistry>,
        room_state: Arc<dyn RoomStateRepository>,
        fanout: Arc<Fanout>,
        max_options: usize,
    ) -> Self {
        Self {
            registry,
            room_state,
            fanout,
            max_options,
        }
    }

    pub async fn start(
        &self,
        connection_id: &ConnectionId,
        request: StartVoteRequest,
    ) -> Result<VoteResultsDto, CoordinatorError> {
        let sub_room = RoomId::for_session(&request.session_id);
        let teacher = require_teacher_of(self.registry.as_ref(), connection_id, &sub_room).await?;
        let vote = VoteSession::start(
            request.question,
            request.options,
            self.max_options,
            teacher.user_id,
            self.fanout.now(),
        )?;

        let vote = self.room_state.start_vote(&sub_room, vote).await?;
        let results = conversion::vote_results(&vote, request.session_id.as_str());

        self.fanout
            .to_room(&sub_room, &ServerEvent::VoteStarted(results.clone()), None)
            .await;
        tracing::info!(
            "Vote '{}' started in {} with {} option(s)",
            vote.id,
            sub_room,
            vote.options.len()
        );
        Ok(results)
    }

    /// 投票する。同じユーザーの再投票は前の票を置き換える
    pub async fn submit(
        &self,
        connection_id: &ConnectionId,
        request: SubmitVoteRequest,
    ) -> Result<VoteResultsDto, CoordinatorError> {
        let sub_room = RoomId::for_session(&request.session_id);
        let voter = require_member(self.registry.as_ref(), connection_id, &sub_room).await?;

        let vote = self
            .room_state
            .submit_vote(&sub_room, voter.user_id.clone(), &request.option_id)
            .await?;
        let results = conversion::vote_results(&vote, request.session_id.as_str());

        self.fanout
            .to_room(&sub_room, &ServerEvent::VoteUpdate(results.clone()), None)
            .await;
        tracing::debug!(
            "'{}' voted '{}' in '{}' ({} vote(s))",
            voter.user_id,
            request.option_id,
            vote.id,
            results.total_votes
        );
        Ok(results)
    }

    pub async fn end(
        &self,
        connection_id: &ConnectionId,
        session_id: SessionId,
    ) -> Result<VoteResultsDto, CoordinatorError> {
        let sub_room = RoomId::for_session(&session_id);
        require_teacher_of(self.registry.as_ref(), connection_id, &sub_room).await?;

        let vote = self
            .room_state
            .end_vote(&sub_room, self.fanout.now())
            .await?;
        let results = conversion::vote_results(&vote, session_id.as_str());

        self.fanout
            .to_room(&sub_room, &ServerEvent::VoteEnded(results.clone()), None)
            .await;
        tracing::info!("Vote '{}' ended ({} vote(s))", vote.id, results.total_votes);
        Ok(results)
    }

    /// 現在（または直前）の投票の集計
    pub async fn results(
        &self,
        connection_id: &ConnectionId,
        session_id: SessionId,
    ) -> Result<VoteResultsDto, CoordinatorError> {
        let sub_room = RoomId::for_session(&session_id);
        require_member(self.registry.as_ref(), connection_id, &sub_room).await?;
        let vote = self
            .room_state
            .current_vote(&sub_room)
            .await
            .ok_or(VoteError::VoteNotFound)?;
        Ok(conversion::vote_results(&vote, session_id.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DEFAULT_MAX_VOTE_OPTIONS, RoomKind, UserRole};
    use crate::usecase::test_support::{Harness, drain, event_names};

    const SESSION: &str = "session-1";

    fn create_usecase(h: &Harness) -> VoteUseCase {
        VoteUseCase::new(
            h.registry.clone(),
            h.room_state.clone(),
            h.fanout.clone(),
            DEFAULT_MAX_VOTE_OPTIONS,
        )
    }

    fn start_request(options: &[&str]) -> StartVoteRequest {
        StartVoteRequest {
            session_id: Harness::session_id(SESSION),
            question: "Which is prime?".to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
        }
    }

    fn submit_request(option_id: &str) -> SubmitVoteRequest {
        SubmitVoteRequest {
            session_id: Harness::session_id(SESSION),
            option_id: option_id.to_string(),
        }
    }

    /// 教師と生徒 2 人がセッションルームに参加済みのクラスルーム
    struct Fixture {
        t: ConnectionId,
        s1: ConnectionId,
        s2: ConnectionId,
        trx: tokio::sync::mpsc::UnboundedReceiver<String>,
        _student_rxs: Vec<tokio::sync::mpsc::UnboundedReceiver<String>>,
    }

    async fn classroom_in_session(h: &Harness) -> Fixture {
        let (t, trx) = h.enroll("t", "teacher", UserRole::Teacher, "classroom-1").await;
        let (s1, s1rx) = h.enroll("s1", "s1", UserRole::Student, "classroom-1").await;
        let (s2, s2rx) = h.enroll("s2", "s2", UserRole::Student, "classroom-1").await;
        let sub_room = RoomId::for_session(&Harness::session_id(SESSION));
        for c in [&t, &s1, &s2] {
            h.registry
                .join_room(c, &sub_room, RoomKind::Session, h.fanout.now())
                .await
                .unwrap();
        }
        Fixture {
            t,
            s1,
            s2,
            trx,
            _student_rxs: vec![s1rx, s2rx],
        }
    }

    #[tokio::test]
    async fn test_start_vote_assigns_option_ids_and_broadcasts() {
        // テスト項目: 投票を開始すると A, B, ... の ID が振られ、セッションルームに vote-started が届く
        // given (前提条件):
        let h = Harness::new();
        let usecase = create_usecase(&h);
        let mut f = classroom_in_session(&h).await;
        let t = f.t.clone();

        // when (操作):
        let results = usecase.start(&t, start_request(&["2", "4", "9"])).await.unwrap();

        // then (期待する結果):
        let ids: Vec<&str> = results.results.iter().map(|r| r.option_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
        assert_eq!(results.total_votes, 0);
        assert!(results.active);
        assert_eq!(event_names(&drain(&mut f.trx)), vec!["vote-started"]);
    }

    #[tokio::test]
    async fn test_start_vote_rejects_invalid_requests() {
        // テスト項目: 生徒による開始・選択肢が多すぎる/少なすぎる開始・二重の開始が拒否される
        // given (前提条件):
        let h = Harness::new();
        let usecase = create_usecase(&h);
        let f = classroom_in_session(&h).await;
        let (t, s1) = (f.t.clone(), f.s1.clone());

        // when (操作):
        let by_student = usecase.start(&s1, start_request(&["a", "b"])).await;
        let too_many = usecase
            .start(&t, start_request(&["a", "b", "c", "d", "e", "f"]))
            .await;
        let too_few = usecase.start(&t, start_request(&["a"])).await;
        usecase.start(&t, start_request(&["a", "b"])).await.unwrap();
        let twice = usecase.start(&t, start_request(&["c", "d"])).await;

        // then (期待する結果):
        assert_eq!(by_student.unwrap_err().code(), "Unauthorized");
        assert_eq!(too_many.unwrap_err().code(), "TooManyOptions");
        assert_eq!(too_few.unwrap_err().code(), "ValidationError");
        assert_eq!(twice.unwrap_err().code(), "VoteAlreadyActive");
    }

    #[tokio::test]
    async fn test_revote_replaces_previous_choice() {
        // テスト項目: 同じ生徒の再投票は前の票を置き換え、合計は投票者数のまま
        // given (前提条件):
        let h = Harness::new();
        let usecase = create_usecase(&h);
        let mut f = classroom_in_session(&h).await;
        let (t, s1, s2) = (f.t.clone(), f.s1.clone(), f.s2.clone());
        usecase.start(&t, start_request(&["2", "4"])).await.unwrap();
        usecase.submit(&s1, submit_request("A")).await.unwrap();
        usecase.submit(&s2, submit_request("A")).await.unwrap();

        // when (操作):
        let results = usecase.submit(&s1, submit_request("B")).await.unwrap();

        // then (期待する結果):
        let counts: Vec<u32> = results.results.iter().map(|r| r.count).collect();
        assert_eq!(counts, vec![1, 1]);
        assert_eq!(results.total_votes, 2);
        assert_eq!(
            event_names(&drain(&mut f.trx)),
            vec!["vote-started", "vote-update", "vote-update", "vote-update"]
        );
    }

    #[tokio::test]
    async fn test_submit_errors() {
        // テスト項目: 投票が無い・存在しない選択肢・終了後の投票・未参加の接続がそれぞれのエラーになる
        // given (前提条件):
        let h = Harness::new();
        let usecase = create_usecase(&h);
        let f = classroom_in_session(&h).await;
        let (t, s1) = (f.t.clone(), f.s1.clone());
        let (stranger, _rx) = h.connect("stranger").await;

        // when (操作):
        let no_vote = usecase.submit(&s1, submit_request("A")).await;
        usecase.start(&t, start_request(&["2", "4"])).await.unwrap();
        let unknown_option = usecase.submit(&s1, submit_request("Z")).await;
        let unregistered = usecase.submit(&stranger, submit_request("A")).await;
        usecase
            .end(&t, Harness::session_id(SESSION))
            .await
            .unwrap();
        let after_end = usecase.submit(&s1, submit_request("A")).await;

        // then (期待する結果):
        assert_eq!(no_vote.unwrap_err().code(), "VoteNotFound");
        assert_eq!(unknown_option.unwrap_err().code(), "InvalidOption");
        assert_eq!(unregistered.unwrap_err().code(), "UserNotFound");
        assert_eq!(after_end.unwrap_err().code(), "VoteEnded");
    }

    #[tokio::test]
    async fn test_vote_requires_membership_of_session_room() {
        // テスト項目: セッションルームに参加していない教師・生徒の開始・投票・終了は UserNotFound になり、投票の状態は作られない
        // given (前提条件):
        let h = Harness::new();
        let usecase = create_usecase(&h);
        let (other_teacher, _trx) = h.enroll("t2", "t2", UserRole::Teacher, "classroom-2").await;
        let (other_student, _srx) = h.enroll("s9", "s9", UserRole::Student, "classroom-2").await;

        // when (操作):
        let started = usecase.start(&other_teacher, start_request(&["a", "b"])).await;
        let submitted = usecase.submit(&other_student, submit_request("A")).await;
        let ended = usecase
            .end(&other_teacher, Harness::session_id(SESSION))
            .await;

        // then (期待する結果):
        assert_eq!(started.unwrap_err().code(), "UserNotFound");
        assert_eq!(submitted.unwrap_err().code(), "UserNotFound");
        assert_eq!(ended.unwrap_err().code(), "UserNotFound");
        assert_eq!(h.room_state.tracked_rooms().await, 0);
    }

    #[tokio::test]
    async fn test_end_vote_and_start_next_one() {
        // テスト項目: 終了した投票の結果が確定し、次の投票で置き換えられる
        // given (前提条件):
        let h = Harness::new();
        let usecase = create_usecase(&h);
        let f = classroom_in_session(&h).await;
        let (t, s1) = (f.t.clone(), f.s1.clone());
        usecase.start(&t, start_request(&["2", "4"])).await.unwrap();
        usecase.submit(&s1, submit_request("B")).await.unwrap();

        // when (操作):
        let ended = usecase.end(&t, Harness::session_id(SESSION)).await.unwrap();
        let ended_again = usecase.end(&t, Harness::session_id(SESSION)).await;
        h.clock.advance(10);
        let next = usecase.start(&t, start_request(&["x", "y", "z"])).await.unwrap();
        let current = usecase
            .results(&s1, Harness::session_id(SESSION))
            .await
            .unwrap();

        // then (期待する結果):
        assert!(!ended.active);
        assert_eq!(ended.results[1].count, 1);
        assert!(ended.ended_at.is_some());
        assert_eq!(ended_again.unwrap_err().code(), "VoteEnded");
        assert_ne!(next.vote_id, ended.vote_id);
        assert_eq!(current, next);
    }
}
