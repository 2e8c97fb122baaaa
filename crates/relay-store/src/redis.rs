//! Redis backend.
//!
//! History is a Redis list under the topic's storage key; pub/sub rides the
//! bare topic name. Appending runs `RPUSH` and `PUBLISH` in one pipeline so
//! a record never lands in history without its live publish being attempted.
//! Commands go through a [`ConnectionManager`], which reconnects on its own;
//! pub/sub uses a dedicated connection per subscription, as Redis requires.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use redis::aio::ConnectionManager;
use relay_core::{MessageRecord, Topic};
use tracing::debug;

use crate::errors::StoreError;
use crate::store::{HistoryStore, PayloadStream};

/// Redis-backed [`HistoryStore`].
pub struct RedisHistoryStore {
    client: redis::Client,
    conn: ConnectionManager,
}

impl RedisHistoryStore {
    /// Connect to the Redis server at `url` (e.g. `redis://127.0.0.1:6379`).
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client.clone()).await?;
        debug!(url, "connected to redis");
        Ok(Self { client, conn })
    }
}

#[async_trait]
impl HistoryStore for RedisHistoryStore {
    async fn append_and_publish(
        &self,
        topic: &Topic,
        record: &MessageRecord,
    ) -> Result<(), StoreError> {
        let json = record.to_json()?;
        let mut conn = self.conn.clone();
        // History gets the full record; subscribers get the raw payload.
        let () = redis::pipe()
            .cmd("RPUSH")
            .arg(topic.storage_key())
            .arg(&json)
            .ignore()
            .cmd("PUBLISH")
            .arg(topic.as_str())
            .arg(record.payload.as_ref())
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn read_all(&self, topic: &Topic) -> Result<Vec<MessageRecord>, StoreError> {
        let mut conn = self.conn.clone();
        let raw: Vec<String> = redis::cmd("LRANGE")
            .arg(topic.storage_key())
            .arg(0)
            .arg(-1)
            .query_async(&mut conn)
            .await?;
        raw.iter()
            .map(|item| MessageRecord::from_json(item).map_err(StoreError::from))
            .collect()
    }

    async fn subscribe(&self, topic: &Topic) -> Result<PayloadStream, StoreError> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(topic.as_str()).await?;
        debug!(topic = %topic, "subscribed to redis channel");
        // `into_on_message` yields data messages only; subscribe
        // acknowledgements never reach the stream.
        let stream = pubsub
            .into_on_message()
            .map(|msg| Ok(Bytes::from(msg.get_payload_bytes().to_vec())));
        Ok(stream.boxed())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
