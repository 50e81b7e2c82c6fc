//! インメモリ実装
//!
//! - `registry`: Connection Registry / Room table
//! - `room_state`: ルーム単位の状態（投票・メッセージ履歴・授業セッション）

pub mod registry;
pub mod room_state;

pub use registry::InMemoryConnectionRegistry;
pub use room_state::InMemoryRoomStateRepository;
