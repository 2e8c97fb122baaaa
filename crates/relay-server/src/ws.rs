//! WebSocket routing shim: upgrade handling plus adapters from the split
//! socket halves to the transport traits.

use async_trait::async_trait;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use relay_core::TransportError;
use std::sync::Arc;
use tracing::error;

use crate::server::AppState;
use crate::session::Session;
use crate::transport::{TransportRx, TransportTx};

/// GET /ws. Every connection attempt also (idempotently) starts the
/// channel listener.
pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    state.listener.start();
    ws.max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (sink, stream) = socket.split();
    let session = Session::new(
        state.config.topic.clone(),
        Arc::clone(&state.store),
        Arc::clone(&state.registry),
    )
    .with_queue_capacity(state.config.queue_capacity);
    let session_id = session.id().clone();

    if let Err(e) = session.run(WsRx { inner: stream }, WsTx { inner: sink }).await {
        error!(session_id = %session_id, error = %e, "session terminated on store failure");
    }
}

/// Read half of the socket as a [`TransportRx`].
///
/// Text and binary frames both carry payloads; control frames are handled
/// here and never reach the session.
pub struct WsRx {
    inner: SplitStream<WebSocket>,
}

#[async_trait]
impl TransportRx for WsRx {
    async fn recv(&mut self) -> Result<Option<Bytes>, TransportError> {
        while let Some(frame) = self.inner.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    return Ok(Some(Bytes::copy_from_slice(text.as_bytes())));
                }
                Ok(Message::Binary(data)) => return Ok(Some(data)),
                Ok(Message::Close(_)) => return Ok(None),
                // axum answers pings itself.
                Ok(Message::Ping(_) | Message::Pong(_)) => {}
                Err(e) => return Err(TransportError::Closed(e.to_string())),
            }
        }
        Ok(None)
    }
}

/// Write half of the socket as a [`TransportTx`]. Payloads go out as binary
/// frames, preserving them byte for byte.
pub struct WsTx {
    inner: SplitSink<WebSocket, Message>,
}

#[async_trait]
impl TransportTx for WsTx {
    async fn send(&mut self, payload: Bytes) -> Result<(), TransportError> {
        self.inner
            .send(Message::Binary(payload))
            .await
            .map_err(|e| TransportError::Closed(e.to_string()))
    }
}
