//! Real-time classroom session coordinator.
//!
//! Tracks which connection belongs to which user, which rooms (classroom,
//! teaching session, breakout) each user occupies, and fans classroom events
//! (presence, teacher control, votes, dialogue, status, broadcast) out to the
//! right members over WebSocket.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub mod config;
