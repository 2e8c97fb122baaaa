//! Foundation types shared across the relay workspace.
//!
//! Everything here is transport- and storage-agnostic: branded IDs, the
//! [`Topic`] a relay serves, the [`MessageRecord`] stored per message, and
//! the error taxonomy for transport failures.

#![deny(unsafe_code)]

pub mod errors;
pub mod ids;
pub mod message;
pub mod topic;

pub use errors::TransportError;
pub use ids::{SenderId, SessionId};
pub use message::MessageRecord;
pub use topic::Topic;
