//! shellcache - offline cache manager for web application shells
//!
//! Keeps a deployed app's resources in named request/response stores:
//! core resources are prefetched at install, the cache is reconciled
//! against each new manifest at activation, and requests are served
//! cache-first (network-first for the document root).

pub mod audit;
pub mod cli;
pub mod config;
pub mod error;
pub mod manifest;
pub mod net;
pub mod store;
pub mod ui;
pub mod worker;

#[cfg(test)]
mod testing;

pub use error::{ShellCacheError, ShellCacheResult};
