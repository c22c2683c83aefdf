//! Subcommand implementations.

pub mod ask;
pub mod auth;
pub mod serve;
pub mod tools;
