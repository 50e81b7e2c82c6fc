//! WebSocket / HTTP surface of the coordinator.

mod dispatcher;
mod handler;
mod request;
mod server;
mod signal;
pub mod state;

pub use server::Server;
pub use state::AppState;
