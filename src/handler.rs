//! WebSocket connection handler
//!
//! Handles one client connection: WebSocket handshake, request parsing,
//! and concurrent dispatch into the shared `SessionService`. Each parsed
//! call runs in its own spawned task so a blocked listen call never stalls
//! other calls multiplexed over the same connection; responses funnel
//! through an mpsc channel into a single write task and are paired with
//! their request by sequence number.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, warn};

use crate::error::AppError;
use crate::message::{Call, ErrorCode, Reply, Request, Response};
use crate::service::SessionService;

/// Buffer size for the per-connection response channel
const RESPONSE_BUFFER_SIZE: usize = 32;

/// Handle a new TCP connection
///
/// Performs the WebSocket handshake, then reads request frames until the
/// peer disconnects. A connection dropping does NOT unregister the client;
/// unregistration only happens through an explicit Unregister call, so a
/// session orphaned by a vanished peer keeps buffering envelopes until its
/// mailbox fills.
pub async fn handle_connection(
    stream: TcpStream,
    service: Arc<SessionService>,
) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    debug!("New TCP connection from {}", peer_addr);

    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Responses from all in-flight call tasks funnel through one channel
    // into one writer, since the sink half cannot be shared.
    let (resp_tx, mut resp_rx) = mpsc::channel::<Response>(RESPONSE_BUFFER_SIZE);

    let write_task = tokio::spawn(async move {
        while let Some(resp) = resp_rx.recv().await {
            match serde_json::to_string(&resp) {
                Ok(json) => {
                    if ws_sender.send(Message::Text(json.into())).await.is_err() {
                        debug!("WebSocket send failed, ending write task");
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to serialize response: {}", e);
                }
            }
        }
        let _ = ws_sender.close().await;
    });

    while let Some(msg_result) = ws_receiver.next().await {
        match msg_result {
            Ok(Message::Text(text)) => match serde_json::from_str::<Request>(&text) {
                Ok(request) => {
                    let service = Arc::clone(&service);
                    let resp_tx = resp_tx.clone();
                    tokio::spawn(async move {
                        let reply = dispatch(&service, request.call).await;
                        let _ = resp_tx
                            .send(Response {
                                seq: request.seq,
                                reply,
                            })
                            .await;
                    });
                }
                Err(e) => {
                    warn!("Invalid request from {}: {}", peer_addr, e);
                    let response = Response {
                        seq: 0,
                        reply: Reply::Error {
                            code: ErrorCode::InvalidRequest,
                            message: e.to_string(),
                        },
                    };
                    if resp_tx.send(response).await.is_err() {
                        break;
                    }
                }
            },
            Ok(Message::Close(_)) => {
                debug!("Peer {} sent close frame", peer_addr);
                break;
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                // Pong is handled automatically by tungstenite.
            }
            Ok(_) => {
                // Binary or other frame types - ignore.
            }
            Err(e) => {
                error!("WebSocket error for {}: {}", peer_addr, e);
                break;
            }
        }
    }

    // In-flight call tasks keep their response sender clones; the write
    // task ends once the last clone drops. A listen task blocked on a
    // never-closed mailbox outlives the connection.
    drop(resp_tx);
    let _ = write_task.await;

    debug!("Connection from {} closed", peer_addr);
    Ok(())
}

/// Run one call against the service and produce its reply
pub async fn dispatch(service: &SessionService, call: Call) -> Reply {
    match call {
        Call::Register { display_name } => Reply::Registered {
            client_id: service.register(&display_name),
        },
        Call::Unregister { client_id } => Reply::Unregistered {
            success: service.unregister(&client_id),
        },
        Call::Listen { client_id } => match service.listen(&client_id).await {
            Ok(envelope) => Reply::Delivery { envelope },
            Err(err) => Reply::from(&err),
        },
        Call::SendMessage {
            client_id,
            display_name,
            text,
        } => Reply::Sent {
            success: service.send_message(&client_id, &display_name, &text),
        },
    }
}
