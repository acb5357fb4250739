//! Task execution module
//!
//! This module handles running the commands behind manifest-declared tasks.

pub mod command;

pub use command::CommandExecutor;
