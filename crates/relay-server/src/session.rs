//! Session lifecycle, from join through teardown.

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use metrics::{counter, gauge, histogram};
use relay_core::{MessageRecord, SenderId, SessionId, Topic, TransportError};
use relay_store::{HistoryStore, StoreError};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::errors::SessionError;
use crate::handle::SessionHandle;
use crate::metrics::{
    MESSAGES_IN_TOTAL, SESSION_DURATION_SECONDS, SESSIONS_ACTIVE, SESSIONS_CLOSED_TOTAL,
    SESSIONS_TOTAL,
};
use crate::registry::ConnectionRegistry;
use crate::transport::{TransportRx, TransportTx};

/// Default outbound queue capacity when none is configured.
const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// One connected client.
///
/// [`Session::run`] drives the whole lifecycle: replay stored history to the
/// outbound queue, join the registry, then pump inbound (transport → store
/// append + publish) and outbound (queue → transport) concurrently. When
/// either pump finishes the other is aborted and the session leaves the
/// registry.
///
/// Replay snapshots history before the registry learns about the session, so
/// no live traffic can be queued ahead of stored messages. The snapshot is
/// not atomic with the listener's subscription: a publish racing the join may
/// appear once via replay and once live, or not at all until the next join.
pub struct Session {
    id: SessionId,
    sender_id: SenderId,
    topic: Topic,
    store: Arc<dyn HistoryStore>,
    registry: Arc<ConnectionRegistry>,
    queue_capacity: usize,
    on_exit: Option<Box<dyn FnOnce(&SessionId) + Send + Sync + 'static>>,
}

impl Session {
    /// Create a session for a freshly accepted connection.
    #[must_use]
    pub fn new(
        topic: Topic,
        store: Arc<dyn HistoryStore>,
        registry: Arc<ConnectionRegistry>,
    ) -> Self {
        Self {
            id: SessionId::new(),
            sender_id: SenderId::new(),
            topic,
            store,
            registry,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            on_exit: None,
        }
    }

    /// Override the outbound queue capacity.
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Run `hook` once after the session has left the registry.
    #[must_use]
    pub fn with_on_exit(mut self, hook: impl FnOnce(&SessionId) + Send + Sync + 'static) -> Self {
        self.on_exit = Some(Box::new(hook));
        self
    }

    /// This session's ID.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// The sender ID attributed to this session's stored messages.
    pub fn sender_id(&self) -> &SenderId {
        &self.sender_id
    }

    /// Drive the session until the connection ends.
    ///
    /// `Ok` covers every ordinary ending, including transport failures in
    /// either direction; `Err` means a store operation failed and the
    /// session was terminated.
    #[instrument(skip_all, fields(session_id = %self.id))]
    pub async fn run<R, T>(mut self, rx: R, tx: T) -> Result<(), SessionError>
    where
        R: TransportRx,
        T: TransportTx,
    {
        let started = Instant::now();
        let (queue_tx, queue_rx) = mpsc::channel::<Bytes>(self.queue_capacity);
        let handle = Arc::new(SessionHandle::new(self.id.clone(), queue_tx.clone()));

        counter!(SESSIONS_TOTAL).increment(1);
        gauge!(SESSIONS_ACTIVE).increment(1.0);
        info!("session opened");

        // The outbound pump runs during replay so a long history cannot
        // deadlock against the bounded queue.
        let mut outbound = tokio::spawn(outbound_pump(tx, queue_rx));

        let outcome = match self.replay(&queue_tx).await {
            Ok(()) => {
                // Only the registry holds a sender now; live traffic cannot
                // have been queued ahead of the replayed history.
                drop(queue_tx);
                self.registry.add(Arc::clone(&handle)).await;

                let mut inbound = tokio::spawn(inbound_pump(
                    rx,
                    Arc::clone(&self.store),
                    self.topic.clone(),
                    self.sender_id.clone(),
                ));

                tokio::select! {
                    res = &mut inbound => {
                        outbound.abort();
                        match res {
                            Ok(Ok(())) => Ok(()),
                            Ok(Err(e)) => Err(SessionError::Store(e)),
                            Err(e) => {
                                warn!(error = %e, "inbound pump did not finish");
                                Ok(())
                            }
                        }
                    }
                    res = &mut outbound => {
                        inbound.abort();
                        match res {
                            Ok(Ok(())) => Ok(()),
                            Ok(Err(e)) => {
                                debug!(error = %e, "outbound transport ended");
                                Ok(())
                            }
                            Err(e) => {
                                warn!(error = %e, "outbound pump did not finish");
                                Ok(())
                            }
                        }
                    }
                }
            }
            Err(e) => {
                outbound.abort();
                Err(SessionError::Store(e))
            }
        };

        self.registry.remove(&self.id).await;
        counter!(SESSIONS_CLOSED_TOTAL).increment(1);
        gauge!(SESSIONS_ACTIVE).decrement(1.0);
        histogram!(SESSION_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
        if handle.drop_count() > 0 {
            debug!(dropped = handle.drop_count(), "payloads were dropped while connected");
        }
        if let Some(on_exit) = self.on_exit.take() {
            on_exit(&self.id);
        }
        info!("session closed");
        outcome
    }

    /// Push the stored history, oldest first, onto the outbound queue.
    async fn replay(&self, queue: &mpsc::Sender<Bytes>) -> Result<(), StoreError> {
        let records = self.store.read_all(&self.topic).await?;
        debug!(count = records.len(), "replaying history");
        for record in records {
            if queue.send(record.payload).await.is_err() {
                // Transport already gone; teardown happens on the pump path.
                break;
            }
        }
        Ok(())
    }
}

/// Transport → store. Each payload is appended to history and published in
/// one store operation; the session's own copy comes back through the
/// pub/sub round trip like everyone else's.
async fn inbound_pump<R: TransportRx>(
    mut rx: R,
    store: Arc<dyn HistoryStore>,
    topic: Topic,
    sender_id: SenderId,
) -> Result<(), StoreError> {
    loop {
        match rx.recv().await {
            Ok(Some(payload)) => {
                let record = MessageRecord::new(sender_id.clone(), payload);
                store.append_and_publish(&topic, &record).await?;
                counter!(MESSAGES_IN_TOTAL).increment(1);
            }
            Ok(None) => return Ok(()),
            Err(e) => {
                debug!(error = %e, "inbound transport ended");
                return Ok(());
            }
        }
    }
}

/// Queue → transport. Ends when the queue closes or a write fails.
async fn outbound_pump<T: TransportTx>(
    mut tx: T,
    mut queue: mpsc::Receiver<Bytes>,
) -> Result<(), TransportError> {
    while let Some(payload) = queue.recv().await {
        tx.send(payload).await?;
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use relay_store::MemoryHistoryStore;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    /// Transport read half fed from a channel; closing the channel is a
    /// clean peer disconnect.
    struct PeerRx(mpsc::Receiver<Bytes>);

    #[async_trait]
    impl TransportRx for PeerRx {
        async fn recv(&mut self) -> Result<Option<Bytes>, TransportError> {
            Ok(self.0.recv().await)
        }
    }

    /// Transport write half mirrored into a channel the test can read.
    struct PeerTx(mpsc::UnboundedSender<Bytes>);

    #[async_trait]
    impl TransportTx for PeerTx {
        async fn send(&mut self, payload: Bytes) -> Result<(), TransportError> {
            self.0
                .send(payload)
                .map_err(|_| TransportError::Closed("peer receiver gone".into()))
        }
    }

    struct Peer {
        to_session: mpsc::Sender<Bytes>,
        from_session: mpsc::UnboundedReceiver<Bytes>,
    }

    fn connect_peer() -> (Peer, PeerRx, PeerTx) {
        let (to_session, rx) = mpsc::channel(32);
        let (tx, from_session) = mpsc::unbounded_channel();
        (
            Peer {
                to_session,
                from_session,
            },
            PeerRx(rx),
            PeerTx(tx),
        )
    }

    fn setup() -> (Arc<MemoryHistoryStore>, Arc<ConnectionRegistry>, Topic) {
        (
            Arc::new(MemoryHistoryStore::new()),
            Arc::new(ConnectionRegistry::new()),
            Topic::from("room1"),
        )
    }

    #[tokio::test]
    async fn replays_history_oldest_first() {
        let (store, registry, topic) = setup();
        for payload in [b"r1" as &[u8], b"r2", b"r3"] {
            let record =
                MessageRecord::new(SenderId::from("earlier"), Bytes::copy_from_slice(payload));
            store.append_and_publish(&topic, &record).await.unwrap();
        }

        let (mut peer, rx, tx) = connect_peer();
        let session = Session::new(topic, store, registry);
        let running = tokio::spawn(session.run(rx, tx));

        for expected in [b"r1" as &[u8], b"r2", b"r3"] {
            assert_eq!(peer.from_session.recv().await.unwrap().as_ref(), expected);
        }

        drop(peer.to_session);
        running.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn inbound_payloads_stored_in_arrival_order() {
        let (store, registry, topic) = setup();
        let (peer, rx, tx) = connect_peer();
        let session = Session::new(topic.clone(), store.clone(), registry);
        let sender_id = session.sender_id().clone();
        let running = tokio::spawn(session.run(rx, tx));

        peer.to_session
            .send(Bytes::from_static(b"first"))
            .await
            .unwrap();
        peer.to_session
            .send(Bytes::from_static(b"second"))
            .await
            .unwrap();

        let history = loop {
            let history = store.read_all(&topic).await.unwrap();
            if history.len() == 2 {
                break history;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        };
        assert_eq!(history[0].payload.as_ref(), b"first");
        assert_eq!(history[1].payload.as_ref(), b"second");
        assert!(history.iter().all(|r| r.sender_id == sender_id));

        drop(peer.to_session);
        running.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn clean_close_leaves_registry() {
        let (store, registry, topic) = setup();
        let (peer, rx, tx) = connect_peer();
        let session = Session::new(topic, store, Arc::clone(&registry));
        let running = tokio::spawn(session.run(rx, tx));

        while registry.count().await == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(registry.count().await, 1);

        drop(peer.to_session);
        running.await.unwrap().unwrap();
        assert_eq!(registry.count().await, 0);
    }

    #[tokio::test]
    async fn live_broadcast_reaches_transport() {
        let (store, registry, topic) = setup();
        let (mut peer, rx, tx) = connect_peer();
        let session = Session::new(topic, store, Arc::clone(&registry));
        let running = tokio::spawn(session.run(rx, tx));

        // Wait for the join, then fan out directly through the registry.
        while registry.count().await == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let delivered = registry
            .broadcast(Bytes::from_static(b"live"))
            .await
            .unwrap();
        assert_eq!(delivered, 1);
        assert_eq!(peer.from_session.recv().await.unwrap().as_ref(), b"live");

        drop(peer.to_session);
        running.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn on_exit_runs_after_teardown() {
        let (store, registry, topic) = setup();
        let (peer, rx, tx) = connect_peer();
        let exited = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&exited);
        let session = Session::new(topic, store, registry)
            .with_on_exit(move |_| flag.store(true, Ordering::SeqCst));
        let running = tokio::spawn(session.run(rx, tx));

        drop(peer.to_session);
        running.await.unwrap().unwrap();
        assert!(exited.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn write_failure_tears_down() {
        let (store, registry, topic) = setup();
        let (mut peer, rx, tx) = connect_peer();
        let session = Session::new(topic, store, Arc::clone(&registry));
        let running = tokio::spawn(session.run(rx, tx));

        while registry.count().await == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        // Peer stops reading entirely.
        peer.from_session.close();
        let _ = registry.broadcast(Bytes::from_static(b"boom"));

        // Write failure ends the session without a session-level error.
        running.await.unwrap().unwrap();
        assert_eq!(registry.count().await, 0);
    }

    /// Store that fails every read.
    struct BrokenStore;

    #[async_trait]
    impl HistoryStore for BrokenStore {
        async fn append_and_publish(
            &self,
            _topic: &Topic,
            _record: &MessageRecord,
        ) -> Result<(), StoreError> {
            Ok(())
        }

        async fn read_all(&self, _topic: &Topic) -> Result<Vec<MessageRecord>, StoreError> {
            Err(StoreError::Unavailable("history backend down".into()))
        }

        async fn subscribe(
            &self,
            _topic: &Topic,
        ) -> Result<relay_store::PayloadStream, StoreError> {
            unimplemented!("not used in this test")
        }
    }

    #[tokio::test]
    async fn replay_failure_surfaces_store_error() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (_peer, rx, tx) = connect_peer();
        let session = Session::new(
            Topic::from("room1"),
            Arc::new(BrokenStore),
            Arc::clone(&registry),
        );
        let result = session.run(rx, tx).await;
        assert!(matches!(result, Err(SessionError::Store(_))));
        assert_eq!(registry.count().await, 0);
    }

    #[tokio::test]
    async fn queue_capacity_is_configurable() {
        let (store, registry, topic) = setup();
        let (_peer, rx, tx) = connect_peer();
        let session = Session::new(topic, store, registry).with_queue_capacity(4);
        assert_eq!(session.queue_capacity, 4);
        drop((rx, tx));
    }
}
