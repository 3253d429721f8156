//! Command-line front-end
//!
//! Argument parsing, the interactive `run` session and the auxiliary
//! subcommands.

pub mod args;
pub mod commands;
pub mod input;
pub mod render;
