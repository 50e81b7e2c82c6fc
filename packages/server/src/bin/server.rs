//! Classroom session coordinator server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin lectern-server
//! cargo run --bin lectern-server -- --host 0.0.0.0 --port 3000 --connection-timeout 120
//! ```

use std::{sync::Arc, time::Duration};

use clap::Parser;
use lectern_server::{
    config::{
        DEFAULT_CONNECTION_TIMEOUT_SECS, DEFAULT_HEARTBEAT_INTERVAL_SECS, DEFAULT_HOST,
        DEFAULT_PORT, ServerConfig,
    },
    domain::{
        DEFAULT_MAX_VOTE_OPTIONS, DEFAULT_MESSAGE_LOG_CAPACITY, MAX_VOTE_OPTIONS,
        MIN_VOTE_OPTIONS, NoopHooks,
    },
    infrastructure::{
        message_pusher::WebSocketMessagePusher,
        repository::{InMemoryConnectionRegistry, InMemoryRoomStateRepository},
    },
    ui::{AppState, Server},
};
use lectern_shared::{logger::setup_logger, time::SystemClock};

#[derive(Parser, Debug)]
#[command(name = "lectern-server")]
#[command(about = "Real-time classroom session coordinator", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = DEFAULT_HOST)]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Seconds between liveness sweeps
    #[arg(long, default_value_t = DEFAULT_HEARTBEAT_INTERVAL_SECS)]
    heartbeat_interval: u64,

    /// Seconds of silence after which a connection is dropped
    #[arg(long, default_value_t = DEFAULT_CONNECTION_TIMEOUT_SECS)]
    connection_timeout: u64,

    /// Messages kept per room
    #[arg(long, default_value_t = DEFAULT_MESSAGE_LOG_CAPACITY)]
    message_capacity: usize,

    /// Maximum number of options in a vote (option ids run from A to Z)
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_VOTE_OPTIONS as u64,
        value_parser = clap::value_parser!(u64).range(MIN_VOTE_OPTIONS as u64..=MAX_VOTE_OPTIONS as u64)
    )]
    max_vote_options: u64,

    /// Default log level (overridden by RUST_LOG)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl From<&Args> for ServerConfig {
    fn from(args: &Args) -> Self {
        Self {
            host: args.host.clone(),
            port: args.port,
            heartbeat_interval: Duration::from_secs(args.heartbeat_interval),
            connection_timeout: Duration::from_secs(args.connection_timeout),
            message_log_capacity: args.message_capacity,
            max_vote_options: args.max_vote_options as usize,
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &args.log_level);

    let config = ServerConfig::from(&args);

    // Initialize dependencies in order:
    // 1. Repositories
    // 2. MessagePusher
    // 3. AppState (UseCases)
    // 4. Server
    let registry = Arc::new(InMemoryConnectionRegistry::new());
    let room_state = Arc::new(InMemoryRoomStateRepository::new(
        config.message_log_capacity,
    ));
    let message_pusher = Arc::new(WebSocketMessagePusher::new());

    let state = AppState::new(
        config,
        registry,
        room_state,
        message_pusher,
        Arc::new(NoopHooks),
        Arc::new(SystemClock),
    );

    if let Err(e) = Server::new(state).run().await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
