//! Command handlers for the `anchor-proof` binary

pub mod commands;

pub use commands::*;
