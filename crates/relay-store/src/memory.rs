//! In-memory backend.
//!
//! History lives in a per-topic `Vec`; the pub/sub channel is a per-topic
//! `tokio::sync::broadcast`. Single process only: nothing crosses process
//! boundaries, which is exactly what tests and local development need.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use parking_lot::{Mutex, RwLock};
use relay_core::{MessageRecord, Topic};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use crate::errors::StoreError;
use crate::store::{HistoryStore, PayloadStream};

/// Buffered payloads per topic channel before slow subscribers start lagging.
const CHANNEL_CAPACITY: usize = 1024;

/// In-memory [`HistoryStore`].
#[derive(Default)]
pub struct MemoryHistoryStore {
    history: RwLock<HashMap<Topic, Vec<MessageRecord>>>,
    channels: Mutex<HashMap<Topic, broadcast::Sender<Bytes>>>,
    subscribe_count: AtomicUsize,
}

impl MemoryHistoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total `subscribe` calls served so far, across all topics.
    #[must_use]
    pub fn subscribe_count(&self) -> usize {
        self.subscribe_count.load(Ordering::SeqCst)
    }

    /// Tear down the topic's pub/sub channel, ending every live subscription.
    /// History is kept. Used to simulate losing the store's channel.
    pub fn close_channel(&self, topic: &Topic) {
        drop(self.channels.lock().remove(topic));
    }

    fn sender_for(&self, topic: &Topic) -> broadcast::Sender<Bytes> {
        self.channels
            .lock()
            .entry(topic.clone())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append_and_publish(
        &self,
        topic: &Topic,
        record: &MessageRecord,
    ) -> Result<(), StoreError> {
        self.history
            .write()
            .entry(topic.clone())
            .or_default()
            .push(record.clone());
        // No receivers is fine; the payload just has no live audience.
        let _ = self.sender_for(topic).send(record.payload.clone());
        Ok(())
    }

    async fn read_all(&self, topic: &Topic) -> Result<Vec<MessageRecord>, StoreError> {
        Ok(self
            .history
            .read()
            .get(topic)
            .cloned()
            .unwrap_or_default())
    }

    async fn subscribe(&self, topic: &Topic) -> Result<PayloadStream, StoreError> {
        let rx = self.sender_for(topic).subscribe();
        let _ = self.subscribe_count.fetch_add(1, Ordering::SeqCst);
        let stream = BroadcastStream::new(rx).map(|item| {
            item.map_err(|BroadcastStreamRecvError::Lagged(n)| StoreError::Lagged(n))
        });
        Ok(stream.boxed())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
