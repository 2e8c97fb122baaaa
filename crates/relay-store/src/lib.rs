//! Durable history plus pub/sub for the relay.
//!
//! [`HistoryStore`] is the single seam between the relay and its backing
//! store: append a record and publish its payload in one operation, read the
//! full history back, and subscribe to the live payload stream. Two backends
//! ship: [`MemoryHistoryStore`] for tests and single-process deployments, and
//! [`RedisHistoryStore`] for production.

#![deny(unsafe_code)]

pub mod errors;
pub mod memory;
pub mod redis;
pub mod store;

pub use self::errors::StoreError;
pub use self::memory::MemoryHistoryStore;
pub use self::redis::RedisHistoryStore;
pub use self::store::{HistoryStore, PayloadStream};
