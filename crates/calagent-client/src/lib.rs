//! The `calagent` command-line interface.
//!
//! Subcommands:
//! - `auth`: one-time Google authorization
//! - `serve`: MCP server over stdio or HTTP
//! - `ask`: one question to Gemini, answered with the calendar tools
//! - `check` / `free`: run a tool directly and print its result

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod llm;
pub mod secret;

pub use cli::Cli;
pub use error::{ClientError, ClientResult};
