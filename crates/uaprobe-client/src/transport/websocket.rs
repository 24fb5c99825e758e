// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! WebSocket binding (`opc.ws://`, `opc.wss://`).
//!
//! One binary WebSocket message carries exactly one frame. The handshake
//! asks for the [`WS_SUBPROTOCOL`] subprotocol.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Position;

use crate::error::TransportError;

use super::frame::Frame;
use super::{MessageTransport, TransportState};

/// WebSocket subprotocol carrying binary UA-SC frames.
pub const WS_SUBPROTOCOL: &str = "opcua+uacp";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// =============================================================================
// WebSocketTransport
// =============================================================================

/// Frame transport over a WebSocket connection.
pub struct WebSocketTransport {
    endpoint_url: String,
    ws_url: String,
    socket: Option<WsStream>,
    state: TransportState,
    max_frame_size: usize,
}

impl WebSocketTransport {
    /// Creates a transport for an `opc.ws://` or `opc.wss://` URL.
    pub fn new(endpoint_url: impl Into<String>) -> Result<Self, TransportError> {
        let endpoint_url = endpoint_url.into();
        let ws_url = websocket_url(&endpoint_url)?;
        Ok(Self {
            endpoint_url,
            ws_url,
            socket: None,
            state: TransportState::Disconnected,
            max_frame_size: 0,
        })
    }

    /// Returns the endpoint URL this transport was created for.
    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    fn socket(&mut self) -> Result<&mut WsStream, TransportError> {
        self.socket.as_mut().ok_or(TransportError::NotConnected)
    }

    fn fail<T>(&mut self, error: TransportError) -> Result<T, TransportError> {
        self.state = TransportState::Failed;
        self.socket = None;
        Err(error)
    }
}

/// Maps `opc.ws`/`opc.wss` (or plain `ws`/`wss`) to the WebSocket URL.
pub(crate) fn websocket_url(endpoint_url: &str) -> Result<String, TransportError> {
    let url = url::Url::parse(endpoint_url)
        .map_err(|e| TransportError::invalid_url(endpoint_url, e.to_string()))?;
    if url.host_str().map_or(true, str::is_empty) {
        return Err(TransportError::invalid_url(endpoint_url, "missing host"));
    }

    let mapped = match url.scheme() {
        "opc.ws" | "ws" => "ws",
        "opc.wss" | "wss" => "wss",
        other => {
            return Err(TransportError::invalid_url(
                endpoint_url,
                format!("scheme '{}' is not a WebSocket scheme", other),
            ))
        }
    };

    // The parsed form is normalized; the raw input may carry leading whitespace.
    Ok(format!("{}://{}", mapped, &url[Position::BeforeUsername..]))
}

#[async_trait]
impl MessageTransport for WebSocketTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.state.is_connected() {
            return Ok(());
        }

        self.state = TransportState::Connecting;

        let mut request = match self.ws_url.as_str().into_client_request() {
            Ok(request) => request,
            Err(e) => {
                let url = self.endpoint_url.clone();
                return self.fail(TransportError::invalid_url(url, e.to_string()));
            }
        };
        request.headers_mut().insert(
            SEC_WEBSOCKET_PROTOCOL,
            HeaderValue::from_static(WS_SUBPROTOCOL),
        );

        let (socket, response) = match connect_async(request).await {
            Ok(pair) => pair,
            Err(tokio_tungstenite::tungstenite::Error::Io(e)) => {
                let target = self.ws_url.clone();
                return self.fail(TransportError::connect(target, e));
            }
            Err(e) => return self.fail(TransportError::WebSocket(e.to_string())),
        };

        let accepted = response
            .headers()
            .get(SEC_WEBSOCKET_PROTOCOL)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if accepted != WS_SUBPROTOCOL {
            tracing::debug!(
                target = %self.ws_url,
                accepted = %accepted,
                "Server did not confirm the WebSocket subprotocol"
            );
        }

        self.socket = Some(socket);
        self.state = TransportState::Connected;

        tracing::debug!(target = %self.ws_url, "WebSocket transport connected");
        Ok(())
    }

    async fn send(&mut self, frame: &Frame) -> Result<(), TransportError> {
        let encoded = frame.encode();
        let size = encoded.len();
        let result = self.socket()?.send(Message::Binary(encoded)).await;
        if let Err(e) = result {
            return self.fail(TransportError::WebSocket(e.to_string()));
        }

        tracing::trace!(message_type = %frame.message_type, size, "WebSocket frame sent");
        Ok(())
    }

    async fn receive(&mut self) -> Result<Frame, TransportError> {
        let max = self.max_frame_size;
        loop {
            let next = self.socket()?.next().await;
            let message = match next {
                Some(Ok(message)) => message,
                Some(Err(e)) => return self.fail(TransportError::WebSocket(e.to_string())),
                None => return self.fail(TransportError::Closed),
            };

            match message {
                Message::Binary(data) => {
                    let frame = match Frame::decode(&data, max) {
                        Ok(frame) => frame,
                        Err(e) => return self.fail(e),
                    };
                    tracing::trace!(
                        message_type = %frame.message_type,
                        size = data.len(),
                        "WebSocket frame received"
                    );
                    return Ok(frame);
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
                Message::Text(_) => {
                    return self.fail(TransportError::malformed(
                        "text message on a binary subprotocol",
                    ))
                }
                Message::Close(_) => return self.fail(TransportError::Closed),
            }
        }
    }

    async fn shutdown(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            if let Err(e) = socket.close(None).await {
                tracing::debug!(error = %e, target = %self.ws_url, "WebSocket close error");
            }
        }
        self.state = TransportState::Disconnected;
    }

    fn state(&self) -> TransportState {
        self.state
    }

    fn set_max_frame_size(&mut self, size: usize) {
        self.max_frame_size = size;
    }

    fn target(&self) -> &str {
        &self.ws_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_websocket_url_mapping() {
        assert_eq!(
            websocket_url("opc.ws://localhost:48043").unwrap(),
            "ws://localhost:48043"
        );
        assert_eq!(
            websocket_url("opc.wss://server.local:443/ua").unwrap(),
            "wss://server.local:443/ua"
        );
        assert_eq!(
            websocket_url("opc.ws://user@h:1/ua?x=1").unwrap(),
            "ws://user@h:1/ua?x=1"
        );
        assert!(websocket_url("opc.tcp://localhost:4840").is_err());
        assert!(websocket_url("garbage").is_err());
    }

    #[test]
    fn test_websocket_url_ignores_surrounding_whitespace() {
        assert_eq!(websocket_url(" opc.ws://h:1").unwrap(), "ws://h:1");
        assert_eq!(websocket_url("\topc.wss://h:1 ").unwrap(), "wss://h:1");

        let transport = WebSocketTransport::new(" opc.ws://h:1").unwrap();
        assert_eq!(transport.target(), "ws://h:1");
    }

    #[tokio::test]
    async fn test_receive_before_connect() {
        let mut transport = WebSocketTransport::new("opc.ws://127.0.0.1:1").unwrap();
        assert!(matches!(
            transport.receive().await,
            Err(TransportError::NotConnected)
        ));
    }
}
