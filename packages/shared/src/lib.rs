//! Utilities shared by the Lectern server binary and library.

pub mod logger;
pub mod time;
