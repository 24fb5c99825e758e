// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `discover` command.

use std::sync::Arc;

use uaprobe_client::client::{select, Catalog, DiscoveryClient};
use uaprobe_client::dispatch::TransportRegistry;

use super::load_settings;
use crate::cli::{Cli, DiscoverArgs, OutputFormat};
use crate::error::{BinError, BinResult};

/// Executes the `discover` command.
///
/// Prints what the server advertises and which endpoint `probe` would pick.
pub async fn discover(cli: &Cli, args: DiscoverArgs) -> BinResult<()> {
    let config = load_settings(cli)?;
    let client = DiscoveryClient::new(
        Arc::new(config.client),
        Arc::new(TransportRegistry::standard()),
    );

    let catalog = client.discover(&args.url).await?;
    let selected = selected_index(&args.url, &catalog);

    match args.format {
        OutputFormat::Text => print!("{}", render_text(&catalog, selected)),
        OutputFormat::Json => {
            let output = serde_json::json!({
                "url": args.url,
                "servers": catalog.servers,
                "endpoints": catalog.endpoints,
                "selected": selected,
            });
            let text = serde_json::to_string_pretty(&output)
                .map_err(|e| BinError::runtime(format!("failed to render JSON: {}", e)))?;
            println!("{}", text);
        }
    }

    if selected.is_none() {
        tracing::warn!(url = %args.url, "No secure endpoint matches the URL scheme");
    }
    Ok(())
}

/// Index of the endpoint `probe` would select.
fn selected_index(url: &str, catalog: &Catalog) -> Option<usize> {
    let chosen = select(url, &catalog.endpoints).ok()?.endpoint;
    catalog.endpoints.iter().rposition(|e| *e == chosen)
}

fn render_text(catalog: &Catalog, selected: Option<usize>) -> String {
    let mut out = String::new();

    out.push_str(&format!("Servers ({}):\n", catalog.servers.len()));
    for server in &catalog.servers {
        out.push_str(&format!(
            "  {} <{}>\n",
            server.application_name, server.application_uri
        ));
        for url in &server.discovery_urls {
            out.push_str(&format!("    discovery: {}\n", url));
        }
    }

    out.push_str(&format!("Endpoints ({}):\n", catalog.endpoints.len()));
    for (i, endpoint) in catalog.endpoints.iter().enumerate() {
        let marker = if Some(i) == selected { '*' } else { ' ' };
        out.push_str(&format!(
            "{} [{}] {} mode={} policy={} level={}\n      profile={}\n",
            marker,
            i,
            endpoint.endpoint_url,
            endpoint.security_mode,
            endpoint.security_policy_uri,
            endpoint.security_level,
            endpoint.transport_profile_uri,
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use uaprobe_client::types::{EndpointDescription, SecurityMode, ServerDescription};

    fn catalog() -> Catalog {
        Catalog {
            servers: vec![ServerDescription::new("TestServer", "urn:test")
                .with_discovery_url("opc.tcp://h:1")],
            endpoints: vec![
                EndpointDescription::new("opc.tcp://h:1", SecurityMode::None, "tcp"),
                EndpointDescription::new("opc.tcp://h:1", SecurityMode::SignAndEncrypt, "tcp"),
                EndpointDescription::new("opc.ws://h:2", SecurityMode::SignAndEncrypt, "ws"),
            ],
        }
    }

    #[test]
    fn test_selected_index_follows_scheme() {
        let catalog = catalog();
        assert_eq!(selected_index("opc.tcp://h:1", &catalog), Some(1));
        assert_eq!(selected_index("opc.ws://h:2", &catalog), Some(2));
        assert_eq!(selected_index("opc.https://h:3", &catalog), None);
    }

    #[test]
    fn test_render_text_marks_selection() {
        let text = render_text(&catalog(), Some(1));
        assert!(text.contains("Servers (1):"));
        assert!(text.contains("TestServer <urn:test>"));
        assert!(text.contains("Endpoints (3):"));
        assert!(text.lines().any(|l| l.starts_with("* [1] opc.tcp://h:1")));
        assert!(text.lines().any(|l| l.starts_with("  [0] opc.tcp://h:1")));
    }
}
