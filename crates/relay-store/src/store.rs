//! The store seam.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use relay_core::{MessageRecord, Topic};

use crate::errors::StoreError;

/// Live payloads from a topic's pub/sub channel.
///
/// Items carry the raw payload bytes as published, not the stored JSON form.
/// An `Err` item is recoverable (the consumer may skip it and keep reading);
/// the stream ending means the subscription itself is gone.
pub type PayloadStream = BoxStream<'static, Result<Bytes, StoreError>>;

/// Append-only history plus pub/sub, per topic.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append `record` to the topic's history and publish its payload to the
    /// topic's channel, as one operation. Subscribers receive the raw
    /// payload; only the history list holds the full record.
    async fn append_and_publish(
        &self,
        topic: &Topic,
        record: &MessageRecord,
    ) -> Result<(), StoreError>;

    /// Read the topic's entire history, oldest first.
    async fn read_all(&self, topic: &Topic) -> Result<Vec<MessageRecord>, StoreError>;

    /// Subscribe to the topic's live payload stream.
    ///
    /// Only data payloads are delivered; backend control frames (such as
    /// subscription acknowledgements) never appear.
    async fn subscribe(&self, topic: &Topic) -> Result<PayloadStream, StoreError>;
}
