//! Infrastructure 層
//!
//! ドメイン層のインターフェースの具体的な実装と、通信用の DTO。

pub mod dto;
pub mod message_pusher;
pub mod repository;
