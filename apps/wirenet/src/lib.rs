//! # Wirenet
//!
//! Library half of the `wirenet` binary: CLI definitions, command
//! implementations and configuration loading. Exposed so integration tests
//! can drive commands without spawning a process.

pub mod cli;
pub mod config;
