//! Named cache stores of request -> response pairs
//!
//! A `CacheStorage` hands out named `CacheStore` handles, creating stores
//! lazily on first open. Three stores back the worker:
//!
//! | Store | Lifetime | Contents |
//! |-------|----------|----------|
//! | content | durable | serves live traffic |
//! | staging | install -> activate | freshly fetched core resources |
//! | manifest | durable | the persisted manifest record |

pub mod disk;
pub mod memory;
mod storage;
mod types;

pub use disk::DiskStorage;
pub use memory::MemoryStorage;
pub use storage::{validate_store_name, CacheStorage, CacheStore};
pub use types::{Method, Request, Response};
