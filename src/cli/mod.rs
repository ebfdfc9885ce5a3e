//! Command-line host for the cache worker

pub mod args;
pub mod commands;

pub use args::{Cli, Commands};
