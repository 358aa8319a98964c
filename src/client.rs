//! Client-side connector
//!
//! `RelayClient` holds one WebSocket connection to the relay and
//! multiplexes concurrent calls over it: each call gets a fresh sequence
//! number and a oneshot slot in a pending-call table, the read task routes
//! incoming responses back by their echoed sequence number. This is what
//! lets one task sit in a perpetual `listen` long-poll while another sends
//! messages over the same connection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::message::{Call, Envelope, ErrorCode, Reply, Request, Response};
use crate::types::ClientId;

/// Buffer size for the outbound request channel
const REQUEST_BUFFER_SIZE: usize = 32;

type PendingCalls = Arc<Mutex<HashMap<u64, oneshot::Sender<Reply>>>>;

/// A connection to the relay server
///
/// Cheap to share: calls only need `&self`, so one instance can serve the
/// listen loop and the send loop concurrently.
#[derive(Debug)]
pub struct RelayClient {
    next_seq: AtomicU64,
    pending: PendingCalls,
    req_tx: mpsc::Sender<Request>,
}

impl RelayClient {
    /// Connect to a relay at `host:port`
    pub async fn connect(addr: &str) -> Result<Self, AppError> {
        let url = format!("ws://{}", addr);
        let (ws_stream, _) = tokio_tungstenite::connect_async(url).await?;
        let (mut ws_sender, mut ws_receiver) = ws_stream.split();

        let (req_tx, mut req_rx) = mpsc::channel::<Request>(REQUEST_BUFFER_SIZE);
        let pending: PendingCalls = Arc::new(Mutex::new(HashMap::new()));

        // Write task: requests -> WebSocket frames.
        tokio::spawn(async move {
            while let Some(req) = req_rx.recv().await {
                match serde_json::to_string(&req) {
                    Ok(json) => {
                        if ws_sender.send(Message::Text(json.into())).await.is_err() {
                            debug!("WebSocket send failed, ending client write task");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Failed to serialize request: {}", e);
                    }
                }
            }
            let _ = ws_sender.close().await;
        });

        // Read task: WebSocket frames -> pending-call completion.
        let pending_reader = Arc::clone(&pending);
        tokio::spawn(async move {
            while let Some(msg_result) = ws_receiver.next().await {
                match msg_result {
                    Ok(Message::Text(text)) => match serde_json::from_str::<Response>(&text) {
                        Ok(resp) => {
                            let slot = pending_reader.lock().unwrap().remove(&resp.seq);
                            match slot {
                                Some(tx) => {
                                    let _ = tx.send(resp.reply);
                                }
                                None => warn!("Response with unknown seq {}", resp.seq),
                            }
                        }
                        Err(e) => warn!("Invalid response frame: {}", e),
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        debug!("WebSocket error, ending client read task: {}", e);
                        break;
                    }
                }
            }
            // Dropping the slots fails every in-flight call, which the
            // listen loop treats like a closed mailbox.
            pending_reader.lock().unwrap().clear();
        });

        Ok(Self {
            next_seq: AtomicU64::new(1),
            pending,
            req_tx,
        })
    }

    /// Issue one call and wait for its paired response
    async fn call(&self, call: Call) -> Result<Reply, AppError> {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().insert(seq, tx);

        if self.req_tx.send(Request { seq, call }).await.is_err() {
            self.pending.lock().unwrap().remove(&seq);
            return Err(AppError::ChannelSend);
        }

        rx.await.map_err(|_| AppError::ChannelSend)
    }

    /// Register a display name, returning the assigned identifier
    pub async fn register(&self, display_name: &str) -> Result<ClientId, AppError> {
        match self
            .call(Call::Register {
                display_name: display_name.to_string(),
            })
            .await?
        {
            Reply::Registered { client_id } => Ok(client_id),
            other => Err(unexpected(other)),
        }
    }

    /// Remove the session with the given identifier
    pub async fn unregister(&self, client_id: &ClientId) -> Result<bool, AppError> {
        match self
            .call(Call::Unregister {
                client_id: client_id.clone(),
            })
            .await?
        {
            Reply::Unregistered { success } => Ok(success),
            other => Err(unexpected(other)),
        }
    }

    /// Long-poll for the next envelope addressed to `client_id`.
    ///
    /// Blocks until the server has an envelope or the session ends; callers
    /// loop on this until it returns a terminal error.
    pub async fn listen(&self, client_id: &ClientId) -> Result<Envelope, AppError> {
        match self
            .call(Call::Listen {
                client_id: client_id.clone(),
            })
            .await?
        {
            Reply::Delivery { envelope } => Ok(envelope),
            Reply::Error {
                code: ErrorCode::NotFound,
                ..
            } => Err(AppError::ClientNotFound(client_id.clone())),
            Reply::Error {
                code: ErrorCode::Closed,
                ..
            } => Err(AppError::MailboxClosed),
            other => Err(unexpected(other)),
        }
    }

    /// Broadcast a chat message to every other connected client
    pub async fn send_message(
        &self,
        client_id: &ClientId,
        display_name: &str,
        text: &str,
    ) -> Result<bool, AppError> {
        match self
            .call(Call::SendMessage {
                client_id: client_id.clone(),
                display_name: display_name.to_string(),
                text: text.to_string(),
            })
            .await?
        {
            Reply::Sent { success } => Ok(success),
            other => Err(unexpected(other)),
        }
    }
}

fn unexpected(reply: Reply) -> AppError {
    match reply {
        Reply::Error { code, message } => {
            AppError::Protocol(format!("server error {:?}: {}", code, message))
        }
        other => AppError::Protocol(format!("unexpected reply: {:?}", other)),
    }
}
