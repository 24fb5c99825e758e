// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Endpoint catalog retrieval.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::channel::{ChannelSettings, SecureChannel};
use crate::codec::{RequestBody, ResponseBody};
use crate::dispatch::TransportRegistry;
use crate::error::{DiscoveryError, ProbeError, ProbeResult};
use crate::types::{ClientConfig, EndpointDescription, ServerDescription};

/// Servers and endpoints advertised at a discovery URL, in received order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    /// FindServers result.
    pub servers: Vec<ServerDescription>,
    /// GetEndpoints result.
    pub endpoints: Vec<EndpointDescription>,
}

impl Catalog {
    /// Returns `true` if no endpoints were advertised.
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

/// Runs FindServers and GetEndpoints over an unsecured channel.
///
/// The channel is private to one `discover` call and is closed on every
/// exit path.
#[derive(Debug, Clone)]
pub struct DiscoveryClient {
    config: Arc<ClientConfig>,
    registry: Arc<TransportRegistry>,
}

impl DiscoveryClient {
    /// Creates a discovery client.
    pub fn new(config: Arc<ClientConfig>, registry: Arc<TransportRegistry>) -> Self {
        Self { config, registry }
    }

    /// Retrieves the catalog from a bare URL.
    pub async fn discover(&self, url: &str) -> ProbeResult<Catalog> {
        let factory = self.registry.resolve_url(url)?;
        let settings = ChannelSettings::discovery(&self.config);

        let mut channel = factory
            .create(url, settings)
            .map_err(|e| ProbeError::discovery(DiscoveryError::channel(url, e)))?;

        tracing::info!(url = %url, binding = factory.name(), "Starting discovery");

        let budget = self.config.discovery_timeout;
        let result = match tokio::time::timeout(budget, exchange(channel.as_mut(), url)).await {
            Ok(result) => result,
            Err(_) => Err(DiscoveryError::TimedOut {
                url: url.to_string(),
                duration: budget,
            }),
        };

        channel.close().await;

        let catalog = result?;
        tracing::info!(
            url = %url,
            servers = catalog.servers.len(),
            endpoints = catalog.endpoints.len(),
            "Discovery complete"
        );
        Ok(catalog)
    }
}

async fn exchange(
    channel: &mut dyn SecureChannel,
    url: &str,
) -> Result<Catalog, DiscoveryError> {
    channel
        .open()
        .await
        .map_err(|e| DiscoveryError::channel(url, e))?;

    let servers = match channel
        .request(RequestBody::FindServers {
            endpoint_url: url.to_string(),
            server_uris: Vec::new(),
        })
        .await
        .map_err(|e| DiscoveryError::channel(url, e))?
    {
        ResponseBody::FindServers { servers } => servers,
        _ => {
            return Err(DiscoveryError::UnexpectedResponse {
                url: url.to_string(),
                service: "FindServers",
            })
        }
    };

    let endpoints = match channel
        .request(RequestBody::GetEndpoints {
            endpoint_url: url.to_string(),
            profile_uris: Vec::new(),
        })
        .await
        .map_err(|e| DiscoveryError::channel(url, e))?
    {
        ResponseBody::GetEndpoints { endpoints } => endpoints,
        _ => {
            return Err(DiscoveryError::UnexpectedResponse {
                url: url.to_string(),
                service: "GetEndpoints",
            })
        }
    };

    Ok(Catalog { servers, endpoints })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::ErrorKind;
    use crate::simulator::{LoopbackFactory, ServerFixture};
    use crate::transport::TCP_PROFILE_URI;
    use crate::types::SecurityMode;

    fn registry(fixture: &ServerFixture) -> Arc<TransportRegistry> {
        let factory = Arc::new(LoopbackFactory::new(fixture.clone(), TCP_PROFILE_URI));
        Arc::new(TransportRegistry::new().with_binding("scheme-a", TCP_PROFILE_URI, factory))
    }

    #[tokio::test]
    async fn test_discover_returns_catalog_in_order() {
        let fixture = ServerFixture::builder()
            .server(ServerDescription::new("TestServer", "urn:test"))
            .endpoint(EndpointDescription::new(
                "scheme-a://host:48040",
                SecurityMode::None,
                TCP_PROFILE_URI,
            ))
            .endpoint(EndpointDescription::new(
                "scheme-a://host:48040",
                SecurityMode::Sign,
                TCP_PROFILE_URI,
            ))
            .build();
        let client = DiscoveryClient::new(Arc::new(ClientConfig::default()), registry(&fixture));

        let catalog = client.discover("scheme-a://host:48040").await.unwrap();
        assert_eq!(catalog.servers.len(), 1);
        assert_eq!(catalog.servers[0].application_uri, "urn:test");
        assert_eq!(catalog.endpoints[0].security_mode, SecurityMode::None);
        assert_eq!(catalog.endpoints[1].security_mode, SecurityMode::Sign);
        assert_eq!(fixture.active_channels(), 0);
    }

    #[tokio::test]
    async fn test_empty_catalog_is_not_an_error() {
        let fixture = ServerFixture::builder().build();
        let client = DiscoveryClient::new(Arc::new(ClientConfig::default()), registry(&fixture));

        let catalog = client.discover("scheme-a://host:1").await.unwrap();
        assert!(catalog.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_discovery_failure() {
        let fixture = ServerFixture::builder().unreachable().build();
        let client = DiscoveryClient::new(Arc::new(ClientConfig::default()), registry(&fixture));

        let err = client.discover("scheme-a://host:1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DiscoveryFailure);
    }

    #[tokio::test]
    async fn test_unknown_scheme_propagates() {
        let fixture = ServerFixture::builder().build();
        let client = DiscoveryClient::new(Arc::new(ClientConfig::default()), registry(&fixture));

        let err = client.discover("scheme-z://host:1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedTransport);
    }

    #[tokio::test]
    async fn test_discovery_timeout() {
        let fixture = ServerFixture::builder().stall_discovery().build();
        let config = ClientConfig::builder()
            .discovery_timeout(Duration::from_millis(50))
            .build()
            .unwrap();
        let client = DiscoveryClient::new(Arc::new(config), registry(&fixture));

        let err = client.discover("scheme-a://host:1").await.unwrap_err();
        assert!(matches!(
            err,
            ProbeError::Discovery(DiscoveryError::TimedOut { .. })
        ));
        assert_eq!(fixture.active_channels(), 0);
    }
}
