//! The relay itself.
//!
//! One process runs one [`server::RelayServer`]. Each WebSocket connection
//! becomes a [`session::Session`] holding a spot in the process-wide
//! [`registry::ConnectionRegistry`]; the singleton [`listener::ChannelListener`]
//! subscribes to the store's pub/sub channel and fans every payload out to the
//! registry. Messages always round-trip through the store, so every relay
//! process sharing that store broadcasts consistently.

#![deny(unsafe_code)]

pub mod config;
pub mod errors;
pub mod handle;
pub mod health;
pub mod listener;
pub mod metrics;
pub mod registry;
pub mod server;
pub mod session;
pub mod shutdown;
pub mod transport;
pub mod ws;

pub use config::ServerConfig;
pub use errors::SessionError;
pub use listener::ChannelListener;
pub use registry::ConnectionRegistry;
pub use server::RelayServer;
pub use session::Session;
