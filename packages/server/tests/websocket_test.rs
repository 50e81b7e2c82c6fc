//! Integration tests for the classroom coordinator over real WebSocket connections.
//!
//! Each test starts the server in-process on an ephemeral port and drives it with
//! `tokio-tungstenite` clients (and `reqwest` for the HTTP API).

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use lectern_server::{
    config::ServerConfig,
    domain::NoopHooks,
    infrastructure::{
        message_pusher::WebSocketMessagePusher,
        repository::{InMemoryConnectionRegistry, InMemoryRoomStateRepository},
    },
    ui::{AppState, Server},
};
use lectern_shared::time::SystemClock;
use serde_json::{Value, json};
use tokio::{net::TcpStream, sync::oneshot, task::JoinHandle};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

const RECV_TIMEOUT: Duration = Duration::from_secs(3);

/// Helper struct to manage the in-process server lifecycle
struct TestServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl TestServer {
    async fn start() -> Self {
        Self::start_with(ServerConfig::default()).await
    }

    async fn start_with(config: ServerConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local addr");

        let state = AppState::new(
            config.clone(),
            Arc::new(InMemoryConnectionRegistry::new()),
            Arc::new(InMemoryRoomStateRepository::new(config.message_log_capacity)),
            Arc::new(WebSocketMessagePusher::new()),
            Arc::new(NoopHooks),
            Arc::new(SystemClock),
        );

        let (shutdown, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            Server::new(state)
                .serve(listener, async {
                    let _ = rx.await;
                })
                .await
                .expect("Server failed");
        });

        TestServer {
            addr,
            shutdown: Some(shutdown),
            handle,
        }
    }

    fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        self.handle.abort();
    }
}

/// Helper struct wrapping one client connection
struct TestClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    /// Events received while waiting for something else
    pending: VecDeque<Value>,
    next_ack: u32,
}

impl TestClient {
    async fn connect(server: &TestServer) -> Self {
        let (ws, _) = connect_async(server.ws_url())
            .await
            .expect("Failed to connect");
        TestClient {
            ws,
            pending: VecDeque::new(),
            next_ack: 0,
        }
    }

    /// Send an event without an ack id
    async fn emit(&mut self, event: &str, payload: Value) {
        let frame = json!({"event": event, "payload": payload}).to_string();
        self.ws
            .send(Message::text(frame))
            .await
            .expect("Failed to send frame");
    }

    /// Send an event and wait for its ack payload
    async fn request(&mut self, event: &str, payload: Value) -> Value {
        self.next_ack += 1;
        let ack_id = self.next_ack.to_string();
        let frame = json!({"event": event, "payload": payload, "ackId": ack_id}).to_string();
        self.ws
            .send(Message::text(frame))
            .await
            .expect("Failed to send frame");

        loop {
            let frame = self.read_frame().await.expect("Connection closed");
            if frame["event"] == "ack" && frame["ackId"] == ack_id.as_str() {
                return frame["payload"].clone();
            }
            self.pending.push_back(frame);
        }
    }

    async fn read_frame(&mut self) -> Option<Value> {
        loop {
            let msg = tokio::time::timeout(RECV_TIMEOUT, self.ws.next())
                .await
                .expect("Timed out waiting for a frame")?;
            match msg {
                Ok(Message::Text(text)) => {
                    return Some(serde_json::from_str(text.as_str()).expect("Invalid JSON frame"));
                }
                Ok(Message::Close(_)) | Err(_) => return None,
                Ok(_) => continue,
            }
        }
    }

    /// Wait for the next event named `name`, skipping unrelated ones
    async fn expect_event(&mut self, name: &str) -> Value {
        if let Some(pos) = self.pending.iter().position(|f| f["event"] == name) {
            return self.pending.remove(pos).map(|f| f["payload"].clone()).unwrap_or_default();
        }
        loop {
            let frame = self
                .read_frame()
                .await
                .unwrap_or_else(|| panic!("Connection closed while waiting for '{}'", name));
            if frame["event"] == name {
                return frame["payload"].clone();
            }
        }
    }

    /// True when the server closes this connection
    async fn closed(&mut self) -> bool {
        loop {
            match self.read_frame().await {
                None => return true,
                Some(_) => continue,
            }
        }
    }
}

async fn join(client: &mut TestClient, user: &str, role: &str, session_id: Option<&str>) -> Value {
    let mut payload = json!({
        "classroomId": "classroom-1",
        "userId": user,
        "userName": user.to_uppercase(),
        "userType": role,
    });
    if let Some(session_id) = session_id {
        payload["sessionId"] = json!(session_id);
    }
    client.request("join-classroom", payload).await
}

#[tokio::test]
async fn test_join_and_chat_reach_the_classroom() {
    // テスト項目: 参加・チャット・教師のブロードキャストがクラスルームのメンバーに届く
    // given (前提条件):
    let server = TestServer::start().await;
    let mut teacher = TestClient::connect(&server).await;
    let mut student = TestClient::connect(&server).await;
    let ack = join(&mut teacher, "t1", "teacher", None).await;
    assert_eq!(ack["success"], true);

    // when (操作):
    let ack = join(&mut student, "s1", "student", None).await;
    let posted = student
        .request(
            "send-message",
            json!({"classroomId": "classroom-1", "content": "hello"}),
        )
        .await;
    let broadcast = teacher
        .request(
            "broadcast",
            json!({
                "target": "classrooms",
                "ids": ["classroom-1"],
                "event": "quiz",
                "data": {"round": 1}
            }),
        )
        .await;

    // then (期待する結果):
    assert_eq!(ack["data"]["totalStudents"], 2);
    assert_eq!(posted["success"], true);

    let joined = teacher.expect_event("student-joined").await;
    assert_eq!(joined["userId"], "s1");
    assert_eq!(joined["totalStudents"], 2);

    let message = teacher.expect_event("new-message").await;
    assert_eq!(message["content"], "hello");
    assert_eq!(message["senderId"], "s1");

    assert_eq!(broadcast["data"]["delivered"], 2);
    let received = student.expect_event("broadcast").await;
    assert_eq!(received["event"], "quiz");
    assert_eq!(received["data"]["round"], 1);
}

#[tokio::test]
async fn test_vote_round_in_a_teaching_session() {
    // テスト項目: 授業セッション内の投票（再投票は上書き、終了後の投票は拒否）
    // given (前提条件):
    let server = TestServer::start().await;
    let mut teacher = TestClient::connect(&server).await;
    join(&mut teacher, "t1", "teacher", None).await;
    let started = teacher
        .request(
            "start-session",
            json!({"classroomId": "classroom-1", "sessionName": "Fractions"}),
        )
        .await;
    let session_id = started["data"]["sessionId"]
        .as_str()
        .expect("sessionId in ack")
        .to_string();

    let mut s1 = TestClient::connect(&server).await;
    let mut s2 = TestClient::connect(&server).await;
    join(&mut s1, "s1", "student", Some(&session_id)).await;
    join(&mut s2, "s2", "student", Some(&session_id)).await;

    // when (操作):
    let vote = teacher
        .request(
            "start-vote",
            json!({
                "sessionId": session_id,
                "question": "1/2 + 1/4 = ?",
                "options": ["2/6", "3/4"]
            }),
        )
        .await;
    s1.expect_event("vote-started").await;
    s2.expect_event("vote-started").await;
    s1.request("submit-vote", json!({"sessionId": session_id, "optionId": "A"}))
        .await;
    s2.request("submit-vote", json!({"sessionId": session_id, "optionId": "B"}))
        .await;
    let resubmitted = s1
        .request("submit-vote", json!({"sessionId": session_id, "optionId": "B"}))
        .await;
    let ended = teacher
        .request("end-vote", json!({"sessionId": session_id}))
        .await;
    let late = s2
        .request("submit-vote", json!({"sessionId": session_id, "optionId": "A"}))
        .await;

    // then (期待する結果):
    assert_eq!(vote["success"], true);
    assert_eq!(vote["data"]["results"][0]["optionId"], "A");
    assert_eq!(vote["data"]["results"][1]["optionId"], "B");

    assert_eq!(resubmitted["data"]["totalVotes"], 2);
    assert_eq!(resubmitted["data"]["results"][0]["count"], 0);
    assert_eq!(resubmitted["data"]["results"][1]["count"], 2);

    assert_eq!(ended["data"]["active"], false);
    let final_results = s2.expect_event("vote-ended").await;
    assert_eq!(final_results["totalVotes"], 2);

    assert_eq!(late["success"], false);
    assert_eq!(late["error"]["code"], "VoteEnded");
}

#[tokio::test]
async fn test_student_is_rejected_from_teacher_controls() {
    // テスト項目: 生徒による授業セッション開始は Unauthorized で、何も配信されない
    // given (前提条件):
    let server = TestServer::start().await;
    let mut student = TestClient::connect(&server).await;
    join(&mut student, "s1", "student", None).await;

    // when (操作):
    let ack = student
        .request("start-session", json!({"classroomId": "classroom-1"}))
        .await;
    let unknown = student.request("self-destruct", json!({})).await;

    // then (期待する結果):
    assert_eq!(ack["error"]["code"], "Unauthorized");
    assert_eq!(unknown["error"]["code"], "UnknownEvent");
    assert!(student.pending.is_empty());
}

#[tokio::test]
async fn test_second_login_replaces_the_first_connection() {
    // テスト項目: 同じユーザーが再接続すると古い接続に session-replaced が届き、閉じられる
    // given (前提条件):
    let server = TestServer::start().await;
    let mut first = TestClient::connect(&server).await;
    join(&mut first, "s1", "student", None).await;

    // when (操作):
    let mut second = TestClient::connect(&server).await;
    let ack = join(&mut second, "s1", "student", None).await;

    // then (期待する結果):
    assert_eq!(ack["data"]["totalStudents"], 1);
    let notice = first.expect_event("disconnect").await;
    assert_eq!(notice["reason"], "session-replaced");
    assert!(first.closed().await);

    let still_usable = second.request("heartbeat", json!({})).await;
    assert_eq!(still_usable["success"], true);
}

#[tokio::test]
async fn test_closing_a_socket_announces_departure() {
    // テスト項目: ソケットを閉じた生徒の student-left（reason: disconnect）が残りのメンバーに届く
    // given (前提条件):
    let server = TestServer::start().await;
    let mut teacher = TestClient::connect(&server).await;
    let mut student = TestClient::connect(&server).await;
    join(&mut teacher, "t1", "teacher", None).await;
    join(&mut student, "s1", "student", None).await;

    // when (操作):
    student.ws.close(None).await.expect("Failed to close");

    // then (期待する結果):
    let left = teacher.expect_event("student-left").await;
    assert_eq!(left["userId"], "s1");
    assert_eq!(left["reason"], "disconnect");
    assert_eq!(left["totalStudents"], 1);
}

#[tokio::test]
async fn test_silent_connection_times_out() {
    // テスト項目: 無通信の接続はタイムアウトで切断され、他のメンバーに student-left が届く
    // given (前提条件):
    let config = ServerConfig {
        heartbeat_interval: Duration::from_millis(100),
        connection_timeout: Duration::from_millis(300),
        ..ServerConfig::default()
    };
    let server = TestServer::start_with(config).await;
    let mut silent = TestClient::connect(&server).await;
    let mut active = TestClient::connect(&server).await;
    join(&mut silent, "s1", "student", None).await;
    join(&mut active, "s2", "student", None).await;

    // when (操作):
    for _ in 0..20 {
        active.emit("heartbeat", json!({})).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    // then (期待する結果):
    let notice = silent.expect_event("disconnect").await;
    assert_eq!(notice["reason"], "timeout");
    assert!(silent.closed().await);

    let left = active.expect_event("student-left").await;
    assert_eq!(left["userId"], "s1");
    assert_eq!(left["reason"], "timeout");
    assert_eq!(left["totalStudents"], 1);
}

#[tokio::test]
async fn test_http_api_reports_rooms() {
    // テスト項目: HTTP API でヘルスチェック・ルーム一覧・ルーム詳細を取得できる
    // given (前提条件):
    let server = TestServer::start().await;
    let mut student = TestClient::connect(&server).await;
    join(&mut student, "s1", "student", None).await;
    let http = reqwest::Client::new();

    // when (操作):
    let health: Value = http
        .get(server.http_url("/api/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let rooms: Value = http
        .get(server.http_url("/api/rooms"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let detail: Value = http
        .get(server.http_url("/api/rooms/classroom-1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let missing = http
        .get(server.http_url("/api/rooms/classroom-404"))
        .send()
        .await
        .unwrap();

    // then (期待する結果):
    assert_eq!(health["status"], "ok");
    assert_eq!(rooms[0]["id"], "classroom-1");
    assert_eq!(rooms[0]["memberCount"], 1);
    assert_eq!(detail["members"][0]["userId"], "s1");
    assert_eq!(detail["members"][0]["userType"], "student");
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
}
