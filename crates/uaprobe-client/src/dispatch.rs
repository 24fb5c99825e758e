// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Transport binding dispatch.
//!
//! The registry is the only place that interprets URL schemes. Everything
//! above it sees a [`ChannelFactory`] and the [`SecureChannel`] it builds.
//!
//! ```text
//! "opc.tcp://…" ─┐                     ┌─▶ TcpChannelFactory       ─▶ UaChannel<TcpTransport>
//! "opc.ws://…"  ─┼─▶ TransportRegistry ┼─▶ WebSocketChannelFactory ─▶ UaChannel<WebSocketTransport>
//! "scheme-a://…"─┘    (scheme, profile)└─▶ registered factory      ─▶ Box<dyn SecureChannel>
//! ```
//!
//! # Examples
//!
//! ```
//! use uaprobe_client::dispatch::TransportRegistry;
//!
//! let registry = TransportRegistry::standard();
//! assert!(registry.resolve_url("opc.tcp://localhost:4840").is_ok());
//! assert!(registry.resolve_url("http://localhost").is_err());
//! ```

use std::fmt;
use std::sync::Arc;

use crate::channel::{ChannelSettings, SecureChannel, UaChannel};
use crate::error::{ChannelError, ProbeError, ProbeResult};
use crate::transport::{TcpTransport, WebSocketTransport, TCP_PROFILE_URI, WS_PROFILE_URI};
use crate::types::EndpointDescription;

// =============================================================================
// ChannelFactory Trait
// =============================================================================

/// Builds channels for one transport binding.
pub trait ChannelFactory: Send + Sync {
    /// Creates an idle channel for the endpoint URL.
    fn create(
        &self,
        endpoint_url: &str,
        settings: ChannelSettings,
    ) -> Result<Box<dyn SecureChannel>, ChannelError>;

    /// Transport profile URI this factory implements.
    fn profile_uri(&self) -> &str;

    /// Binding name for logs.
    fn name(&self) -> &str;
}

/// Factory for the binary TCP binding.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpChannelFactory;

impl ChannelFactory for TcpChannelFactory {
    fn create(
        &self,
        endpoint_url: &str,
        settings: ChannelSettings,
    ) -> Result<Box<dyn SecureChannel>, ChannelError> {
        let transport = TcpTransport::new(endpoint_url)?;
        Ok(Box::new(UaChannel::new(
            transport,
            endpoint_url,
            TCP_PROFILE_URI,
            settings,
        )))
    }

    fn profile_uri(&self) -> &str {
        TCP_PROFILE_URI
    }

    fn name(&self) -> &str {
        "tcp"
    }
}

/// Factory for the WebSocket binding.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketChannelFactory;

impl ChannelFactory for WebSocketChannelFactory {
    fn create(
        &self,
        endpoint_url: &str,
        settings: ChannelSettings,
    ) -> Result<Box<dyn SecureChannel>, ChannelError> {
        let transport = WebSocketTransport::new(endpoint_url)?;
        Ok(Box::new(UaChannel::new(
            transport,
            endpoint_url,
            WS_PROFILE_URI,
            settings,
        )))
    }

    fn profile_uri(&self) -> &str {
        WS_PROFILE_URI
    }

    fn name(&self) -> &str {
        "websocket"
    }
}

// =============================================================================
// TransportRegistry
// =============================================================================

#[derive(Clone)]
struct Binding {
    scheme: String,
    profile_uri: String,
    factory: Arc<dyn ChannelFactory>,
}

/// Maps URL schemes and transport profiles to channel factories.
#[derive(Clone, Default)]
pub struct TransportRegistry {
    bindings: Vec<Binding>,
}

impl TransportRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `opc.tcp`, `opc.ws` and `opc.wss`.
    pub fn standard() -> Self {
        let tcp: Arc<dyn ChannelFactory> = Arc::new(TcpChannelFactory);
        let ws: Arc<dyn ChannelFactory> = Arc::new(WebSocketChannelFactory);
        Self::new()
            .with_binding("opc.tcp", TCP_PROFILE_URI, tcp)
            .with_binding("opc.ws", WS_PROFILE_URI, ws.clone())
            .with_binding("opc.wss", WS_PROFILE_URI, ws)
    }

    /// Adds a binding. A later registration for the same scheme replaces
    /// the earlier one.
    pub fn register(
        &mut self,
        scheme: impl Into<String>,
        profile_uri: impl Into<String>,
        factory: Arc<dyn ChannelFactory>,
    ) {
        let scheme = scheme.into().to_ascii_lowercase();
        self.bindings.retain(|b| b.scheme != scheme);
        tracing::debug!(scheme = %scheme, factory = factory.name(), "Registered transport binding");
        self.bindings.push(Binding {
            scheme,
            profile_uri: profile_uri.into(),
            factory,
        });
    }

    /// Builder form of [`register`](Self::register).
    pub fn with_binding(
        mut self,
        scheme: impl Into<String>,
        profile_uri: impl Into<String>,
        factory: Arc<dyn ChannelFactory>,
    ) -> Self {
        self.register(scheme, profile_uri, factory);
        self
    }

    /// Returns the registered schemes in registration order.
    pub fn schemes(&self) -> Vec<&str> {
        self.bindings.iter().map(|b| b.scheme.as_str()).collect()
    }

    /// Resolves the factory for a selected endpoint: scheme first, then
    /// transport profile.
    pub fn resolve(&self, endpoint: &EndpointDescription) -> ProbeResult<Arc<dyn ChannelFactory>> {
        if let Some(scheme) = scheme_of(&endpoint.endpoint_url) {
            if let Some(binding) = self.by_scheme(&scheme) {
                return Ok(binding.factory.clone());
            }
        }

        if let Some(binding) = self
            .bindings
            .iter()
            .find(|b| b.profile_uri == endpoint.transport_profile_uri)
        {
            return Ok(binding.factory.clone());
        }

        let scheme = scheme_of(&endpoint.endpoint_url)
            .unwrap_or_else(|| endpoint.transport_profile_uri.clone());
        Err(ProbeError::unsupported_transport(scheme))
    }

    /// Resolves the factory for a bare URL by scheme.
    pub fn resolve_url(&self, url: &str) -> ProbeResult<Arc<dyn ChannelFactory>> {
        let scheme = scheme_of(url).ok_or_else(|| ProbeError::unsupported_transport(url))?;
        self.by_scheme(&scheme)
            .map(|b| b.factory.clone())
            .ok_or_else(|| ProbeError::unsupported_transport(scheme))
    }

    fn by_scheme(&self, scheme: &str) -> Option<&Binding> {
        self.bindings.iter().find(|b| b.scheme == scheme)
    }
}

impl fmt::Debug for TransportRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportRegistry")
            .field("schemes", &self.schemes())
            .finish()
    }
}

/// Returns the lowercased scheme of a URL, or `None` if it does not parse.
pub fn scheme_of(url: &str) -> Option<String> {
    url::Url::parse(url).ok().map(|u| u.scheme().to_string())
}
