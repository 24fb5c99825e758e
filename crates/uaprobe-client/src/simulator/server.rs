// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Socket front ends for the simulated server.

use std::io;
use std::net::SocketAddr;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::transport::{ErrorMessage, Frame, FrameHeader, HEADER_SIZE, WS_SUBPROTOCOL};
use crate::types::StatusCode;

use super::connection::{ServerConnection, SERVER_MAX_MESSAGE_SIZE};
use super::fixture::ServerFixture;

const MAX_FRAME_SIZE: usize = SERVER_MAX_MESSAGE_SIZE as usize + HEADER_SIZE;

// =============================================================================
// ServerHandle
// =============================================================================

/// A running listener.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting connections and waits for the listener task.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.task).await {
            tracing::warn!(error = %e, "Listener task ended abnormally");
        }
    }

    /// Waits until the listener stops on its own.
    pub async fn wait(mut self) {
        if let Err(e) = (&mut self.task).await {
            tracing::warn!(error = %e, "Listener task ended abnormally");
        }
    }
}

// =============================================================================
// SimulatedServer
// =============================================================================

/// Serves a [`ServerFixture`] over the TCP and WebSocket bindings.
///
/// ```text
/// TcpListener ──▶ frame reader ──┐
///                                ├──▶ ServerConnection ──▶ ServerFixture
/// axum /ws    ──▶ binary msgs  ──┘
/// ```
#[derive(Debug, Clone)]
pub struct SimulatedServer {
    fixture: ServerFixture,
}

impl SimulatedServer {
    /// Creates a server for the fixture.
    pub fn new(fixture: ServerFixture) -> Self {
        Self { fixture }
    }

    /// Returns the fixture.
    pub fn fixture(&self) -> &ServerFixture {
        &self.fixture
    }

    /// Binds and serves the TCP binding.
    pub async fn serve_tcp(&self, addr: SocketAddr) -> io::Result<ServerHandle> {
        let listener = TcpListener::bind(addr).await?;
        self.serve_tcp_on(listener)
    }

    /// Serves the TCP binding on a bound listener.
    pub fn serve_tcp_on(&self, listener: TcpListener) -> io::Result<ServerHandle> {
        let local_addr = listener.local_addr()?;
        let (tx, mut rx) = oneshot::channel();
        let fixture = self.fixture.clone();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut rx => break,
                    accepted = listener.accept() => match accepted {
                        Ok((stream, peer)) => {
                            tracing::debug!(peer = %peer, "TCP client connected");
                            tokio::spawn(serve_tcp_connection(stream, peer, fixture.clone()));
                        }
                        Err(e) => tracing::warn!(error = %e, "Accept failed"),
                    },
                }
            }
            tracing::debug!(addr = %local_addr, "TCP listener stopped");
        });

        tracing::info!(addr = %local_addr, "Simulated server listening (tcp)");
        Ok(ServerHandle {
            local_addr,
            shutdown: Some(tx),
            task,
        })
    }

    /// Binds and serves the WebSocket binding.
    pub async fn serve_ws(&self, addr: SocketAddr) -> io::Result<ServerHandle> {
        let listener = TcpListener::bind(addr).await?;
        self.serve_ws_on(listener)
    }

    /// Serves the WebSocket binding on a bound listener. Any path upgrades.
    pub fn serve_ws_on(&self, listener: TcpListener) -> io::Result<ServerHandle> {
        let local_addr = listener.local_addr()?;
        let (tx, rx) = oneshot::channel::<()>();

        let app = Router::new()
            .route("/", get(upgrade))
            .route("/{*path}", get(upgrade))
            .with_state(self.fixture.clone());

        let task = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = rx.await;
                })
                .await;
            if let Err(e) = result {
                tracing::warn!(error = %e, "WebSocket listener failed");
            }
            tracing::debug!(addr = %local_addr, "WebSocket listener stopped");
        });

        tracing::info!(addr = %local_addr, "Simulated server listening (websocket)");
        Ok(ServerHandle {
            local_addr,
            shutdown: Some(tx),
            task,
        })
    }
}

// =============================================================================
// Connection Loops
// =============================================================================

async fn serve_tcp_connection(mut stream: TcpStream, peer: SocketAddr, fixture: ServerFixture) {
    let mut connection = ServerConnection::new(fixture);

    loop {
        let mut raw = [0u8; HEADER_SIZE];
        if stream.read_exact(&mut raw).await.is_err() {
            break;
        }
        let header = match FrameHeader::parse(&raw, MAX_FRAME_SIZE) {
            Ok(header) => header,
            Err(e) => {
                let frame = ErrorMessage::new(StatusCode::BAD_DECODING_ERROR, e.to_string())
                    .into_frame();
                let _ = stream.write_all(&frame.encode()).await;
                break;
            }
        };
        let mut body = vec![0u8; header.body_len()];
        if stream.read_exact(&mut body).await.is_err() {
            break;
        }

        let outcome = connection.handle(Frame::new(header.message_type, body));
        for frame in outcome.frames {
            if let Err(e) = stream.write_all(&frame.encode()).await {
                tracing::debug!(peer = %peer, error = %e, "TCP write failed");
                return;
            }
        }
        if outcome.close {
            break;
        }
    }

    let _ = stream.shutdown().await;
    tracing::debug!(peer = %peer, "TCP client disconnected");
}

async fn upgrade(ws: WebSocketUpgrade, State(fixture): State<ServerFixture>) -> Response {
    ws.protocols([WS_SUBPROTOCOL])
        .on_upgrade(move |socket| serve_ws_connection(socket, fixture))
}

async fn serve_ws_connection(mut socket: WebSocket, fixture: ServerFixture) {
    let mut connection = ServerConnection::new(fixture);
    tracing::debug!("WebSocket client connected");

    while let Some(message) = socket.recv().await {
        let data = match message {
            Ok(Message::Binary(data)) => data,
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => continue,
        };

        let outcome = match Frame::decode(&data, MAX_FRAME_SIZE) {
            Ok(frame) => connection.handle(frame),
            Err(e) => {
                let frame = ErrorMessage::new(StatusCode::BAD_DECODING_ERROR, e.to_string())
                    .into_frame();
                let _ = socket.send(Message::Binary(frame.encode())).await;
                break;
            }
        };
        for frame in outcome.frames {
            if socket.send(Message::Binary(frame.encode())).await.is_err() {
                return;
            }
        }
        if outcome.close {
            break;
        }
    }

    let _ = socket.send(Message::Close(None)).await;
    tracing::debug!("WebSocket client disconnected");
}
