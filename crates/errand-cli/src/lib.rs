//! Errand CLI library.
//!
//! Command handlers and output formatting for the `errand-cli` binary.

pub mod commands;
pub mod output;
