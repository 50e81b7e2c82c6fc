//! サーバー設定
//!
//! バイナリの CLI 引数から組み立てる。テストでは `Default` を元に必要な項目だけ上書きする。

use std::time::Duration;

use crate::domain::{DEFAULT_MAX_VOTE_OPTIONS, DEFAULT_MESSAGE_LOG_CAPACITY};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 300;
/// `get-message-history` で limit が省略されたときの件数
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Liveness sweep period
    pub heartbeat_interval: Duration,
    /// A connection silent for longer than this is evicted
    pub connection_timeout: Duration,
    pub message_log_capacity: usize,
    pub max_vote_options: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            heartbeat_interval: Duration::from_secs(DEFAULT_HEARTBEAT_INTERVAL_SECS),
            connection_timeout: Duration::from_secs(DEFAULT_CONNECTION_TIMEOUT_SECS),
            message_log_capacity: DEFAULT_MESSAGE_LOG_CAPACITY,
            max_vote_options: DEFAULT_MAX_VOTE_OPTIONS,
        }
    }
}
