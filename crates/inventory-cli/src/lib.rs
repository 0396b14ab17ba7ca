//! Command handling for the `inventory` binary, independent of the storage backend.

pub mod commands;
pub mod seed;

pub use commands::{execute, Command, CreateArgs};
