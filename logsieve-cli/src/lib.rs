//! logsieve CLI library.
//!
//! Exposes the command handlers and output types for integration testing.
//! In production, `logsieve` is used as a binary (main.rs).

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod metrics_server;
pub mod output;
