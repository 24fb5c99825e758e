// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `serve` command.

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use uaprobe_client::simulator::{ServerFixture, SimulatedServer};

use crate::cli::{Cli, ServeArgs};
use crate::error::{BinError, BinResult};

/// Executes the `serve` command.
///
/// Binds both listeners first so the advertised endpoint URLs carry the
/// actual ports, then serves until Ctrl-C.
pub async fn serve(_cli: &Cli, args: ServeArgs) -> BinResult<()> {
    let tcp_listener = TcpListener::bind(args.tcp)
        .await
        .map_err(|e| BinError::init(format!("failed to bind {}: {}", args.tcp, e)))?;
    let ws_listener = TcpListener::bind(args.ws)
        .await
        .map_err(|e| BinError::init(format!("failed to bind {}: {}", args.ws, e)))?;

    let tcp_url = format!("opc.tcp://{}", tcp_listener.local_addr()?);
    let ws_url = format!("opc.ws://{}", ws_listener.local_addr()?);
    let fixture = ServerFixture::demo(tcp_url.clone(), ws_url.clone());
    let server = SimulatedServer::new(fixture.clone());

    let tcp = server.serve_tcp_on(tcp_listener)?;
    let ws = server.serve_ws_on(ws_listener)?;

    info!(tcp = %tcp_url, ws = %ws_url, "Simulated server listening");
    println!("Serving {} and {} (Ctrl-C to stop)", tcp_url, ws_url);

    tokio::signal::ctrl_c()
        .await
        .context("failed to wait for Ctrl-C")?;

    info!("Shutting down simulated server");
    tcp.shutdown().await;
    ws.shutdown().await;

    info!(
        discovery_calls = fixture.discovery_calls(),
        sessions = fixture.sessions_created(),
        reads = fixture.read_calls(),
        "Simulated server stopped"
    );
    Ok(())
}
