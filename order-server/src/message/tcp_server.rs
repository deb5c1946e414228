//! TCP subscriber server
//!
//! Each connection:
//! - sends one handshake naming its topic
//! - receives every frame published to that topic until it disconnects
//!
//! Subscribers never write after the handshake; anything they send is
//! read and dropped so a closed socket is noticed promptly.

use std::net::SocketAddr;
use std::sync::Arc;

use shared::message::{BusMessage, EventType, HandshakePayload, PROTOCOL_VERSION, ResponsePayload, SyncPayload};
use shared::order::Topic;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::ConnectedClient;
use super::bus::EventBus;
use super::transport::{TcpTransport, Transport};
use crate::utils::AppError;

/// Delay before closing after a handshake error, so the client can read it
const HANDSHAKE_ERROR_DELAY_MS: u64 = 100;

impl EventBus {
    /// Bind the configured address and serve subscribers until shutdown
    pub async fn start_tcp_server(&self) -> Result<(), AppError> {
        let listener = TcpListener::bind(&self.config.tcp_listen_addr)
            .await
            .map_err(|e| AppError::internal(format!("Failed to bind: {}", e)))?;

        tracing::info!(
            "Event bus TCP server listening on {}",
            self.config.tcp_listen_addr
        );

        self.serve(listener).await
    }

    /// Serve subscribers on an already bound listener
    pub async fn serve(&self, listener: TcpListener) -> Result<(), AppError> {
        loop {
            tokio::select! {
                _ = self.shutdown_token().cancelled() => {
                    tracing::info!("Event bus TCP server shutting down");
                    break;
                }

                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            tracing::debug!("Subscriber connected: {}", addr);
                            self.spawn_client_handler(stream, addr);
                        }
                        Err(e) => {
                            tracing::error!("Failed to accept connection: {}", e);
                        }
                    }
                }
            }
        }

        Ok(())
    }

    fn spawn_client_handler(&self, stream: TcpStream, addr: SocketAddr) {
        let bus = self.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_client_connection(bus, stream, addr).await {
                tracing::debug!("Subscriber {} handler finished: {}", addr, e);
            }
        });
    }
}

async fn handle_client_connection(
    bus: EventBus,
    stream: TcpStream,
    addr: SocketAddr,
) -> Result<(), AppError> {
    let transport: Arc<dyn Transport> = Arc::new(TcpTransport::from_stream(stream));

    let (handshake, request_id) = read_handshake(&transport, addr).await?;

    // Subscribe before acknowledging, so nothing published after the
    // client sees the response can be missed
    let rx = bus.subscribe(&handshake.topic);

    let client_id = handshake
        .client_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let response = BusMessage::response(&ResponsePayload::success(
        format!("Subscribed to {}", handshake.topic),
        Some(serde_json::json!({
            "clientId": client_id,
            "topic": handshake.topic,
        })),
    ))
    .with_correlation_id(request_id);
    transport.write_message(&response).await?;

    bus.clients.insert(
        client_id.clone(),
        ConnectedClient {
            id: client_id.clone(),
            name: handshake.client_name.clone(),
            topic: handshake.topic.clone(),
            addr: addr.to_string(),
            connected_at: chrono::Utc::now().timestamp_millis(),
        },
    );
    tracing::info!(client_id = %client_id, topic = %handshake.topic, "Subscriber registered");

    let shutdown_token = bus.shutdown_token().clone();
    let disconnect_token = CancellationToken::new();

    let forward_handle = spawn_topic_forwarder(
        transport.clone(),
        rx,
        shutdown_token.clone(),
        client_id.clone(),
        handshake.topic.clone(),
        disconnect_token.clone(),
    );

    drain_client(&transport, &shutdown_token, &client_id, addr, disconnect_token).await;

    let _ = forward_handle.await;
    let _ = transport.close().await;
    bus.clients.remove(&client_id);
    tracing::debug!(client_id = %client_id, "Subscriber removed from registry");

    Ok(())
}

/// Read and validate the opening handshake
async fn read_handshake(
    transport: &Arc<dyn Transport>,
    addr: SocketAddr,
) -> Result<(HandshakePayload, Uuid), AppError> {
    let msg = transport.read_message().await.map_err(|e| {
        tracing::warn!("Subscriber {} handshake error: {}", addr, e);
        e
    })?;

    if msg.event_type != EventType::Handshake {
        tracing::warn!(
            "Subscriber {} failed to handshake: expected Handshake, got {}",
            addr,
            msg.event_type
        );
        send_handshake_error(transport, &msg, "Expected Handshake message").await;
        return Err(AppError::invalid("Expected Handshake message"));
    }

    let payload: HandshakePayload = match msg.parse_payload() {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!("Subscriber {} sent invalid handshake payload: {}", addr, e);
            send_handshake_error(transport, &msg, &format!("Invalid handshake payload: {}", e))
                .await;
            return Err(AppError::invalid(format!("Invalid handshake payload: {}", e)));
        }
    };

    if payload.version != PROTOCOL_VERSION {
        tracing::warn!(
            "Subscriber {} protocol version mismatch: expected {}, got {}",
            addr,
            PROTOCOL_VERSION,
            payload.version
        );
        send_handshake_error(
            transport,
            &msg,
            &format!(
                "Protocol version mismatch: server={}, client={}",
                PROTOCOL_VERSION, payload.version
            ),
        )
        .await;
        return Err(AppError::invalid("Protocol version mismatch"));
    }

    if let Topic::Table(id) = &payload.topic
        && id.trim().is_empty()
    {
        send_handshake_error(transport, &msg, "Table topic needs a table id").await;
        return Err(AppError::invalid("Empty table topic"));
    }

    Ok((payload, msg.request_id))
}

async fn send_handshake_error(transport: &Arc<dyn Transport>, msg: &BusMessage, message: &str) {
    let response = BusMessage::response(&ResponsePayload::error(
        message,
        Some(shared::error::ErrorCode::InvalidRequest.code().to_string()),
    ))
    .with_correlation_id(msg.request_id);

    if let Err(e) = transport.write_message(&response).await {
        tracing::error!("Failed to send handshake error: {}", e);
    }

    tokio::time::sleep(tokio::time::Duration::from_millis(HANDSHAKE_ERROR_DELAY_MS)).await;
}

/// Forward the topic channel to the socket
fn spawn_topic_forwarder(
    transport: Arc<dyn Transport>,
    mut rx: broadcast::Receiver<BusMessage>,
    shutdown_token: CancellationToken,
    client_id: String,
    topic: Topic,
    disconnect_token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown_token.cancelled() => break,
                _ = disconnect_token.cancelled() => {
                    tracing::debug!(client_id = %client_id, "Subscriber disconnected, forwarder stopping");
                    break;
                }
                msg_result = rx.recv() => {
                    match msg_result {
                        Ok(msg) => {
                            if let Err(e) = transport.write_message(&msg).await {
                                tracing::debug!(client_id = %client_id, "Subscriber write failed: {}", e);
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            tracing::warn!(
                                client_id = %client_id,
                                topic = %topic,
                                dropped_messages = n,
                                "Subscriber lagged behind, sending resync"
                            );
                            let resync = BusMessage::sync(&SyncPayload::lagged(n));
                            if let Err(e) = transport.write_message(&resync).await {
                                tracing::debug!(client_id = %client_id, "Failed to send resync: {}", e);
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            tracing::debug!(client_id = %client_id, "Topic channel closed");
                            break;
                        }
                    }
                }
            }
        }
        // Unblock the reader when the forwarder is the side that stopped
        disconnect_token.cancel();
    })
}

/// Read until the client goes away, discarding anything it sends
async fn drain_client(
    transport: &Arc<dyn Transport>,
    shutdown_token: &CancellationToken,
    client_id: &str,
    addr: SocketAddr,
    disconnect_token: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown_token.cancelled() => break,
            _ = disconnect_token.cancelled() => break,
            read_result = transport.read_message() => {
                match read_result {
                    Ok(msg) => {
                        tracing::debug!(
                            client_id = %client_id,
                            event_type = %msg.event_type,
                            "Ignoring inbound frame from subscriber"
                        );
                    }
                    Err(e) => {
                        if e.code == shared::error::ErrorCode::ClientDisconnected {
                            tracing::debug!(client_id = %client_id, "Subscriber {} disconnected", addr);
                        } else {
                            tracing::debug!(client_id = %client_id, "Subscriber {} read error: {}", addr, e);
                        }
                        break;
                    }
                }
            }
        }
    }
    disconnect_token.cancel();
}
