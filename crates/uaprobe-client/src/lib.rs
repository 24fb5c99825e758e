// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # uaprobe-client
//!
//! OPC UA probe client: finds a server's endpoints, opens a secured session
//! on the most preferred secure one and reads a batch of attributes in a
//! single request.
//!
//! - **Workflow**: the staged run and its observable state
//! - **Client**: discovery, endpoint selection, session bootstrap, read
//! - **Dispatch**: URL scheme to transport binding resolution
//! - **Channel**: HEL/ACK handshake and the secure channel
//! - **Transport**: binary TCP and WebSocket frame bindings
//! - **Report**: line-oriented progress events
//! - **Simulator**: an in-process server for tests and demos
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Workflow                            │
//! │ Discovering ─▶ Selecting ─▶ Bootstrapping ─▶ Reading ─▶ Done │
//! └───────┬────────────┬─────────────┬─────────────┬─────────────┘
//!         │            │             │             │
//!  DiscoveryClient  select()  SessionBootstrap  AttributeReader
//!         │                          │
//!         └──────────┬───────────────┘
//!             TransportRegistry
//!                    │
//!        ┌───────────┴────────────┐
//!   UaChannel<TcpTransport>  UaChannel<WebSocketTransport>
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use uaprobe_client::prelude::*;
//!
//! # async fn run() -> ProbeResult<()> {
//! let workflow = Workflow::builder()
//!     .request(ReadValueId::value("ns=1;s=Node1".parse()?))
//!     .request(ReadValueId::value("ns=1;s=Node2".parse()?))
//!     .sink(LineSink::stdout())
//!     .build()?;
//!
//! let outcome = workflow.spawn("opc.tcp://localhost:48040").wait().await?;
//! println!("{} values", outcome.values.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Core Modules
// =============================================================================

pub mod error;
pub mod types;

// =============================================================================
// Wire Modules
// =============================================================================

pub mod certificate;
pub mod channel;
pub mod codec;
pub mod dispatch;
pub mod transport;

// =============================================================================
// Workflow Modules
// =============================================================================

pub mod client;
pub mod report;
pub mod workflow;

// =============================================================================
// Test Support
// =============================================================================

pub mod simulator;

// =============================================================================
// Re-exports for convenience
// =============================================================================

pub use error::{ErrorKind, ProbeError, ProbeResult};
pub use types::{
    AttributeId, ClientConfig, DataValue, EndpointDescription, NodeId, ReadValueId, SecurityMode,
    SecurityPolicy, ServerDescription, StatusCode, TimestampsToReturn, Variant,
};
pub use workflow::{Workflow, WorkflowBuilder, WorkflowOutcome, WorkflowState, WorkflowTask};

/// Commonly used items.
pub mod prelude {
    pub use crate::certificate::ClientCertificate;
    pub use crate::dispatch::{ChannelFactory, TransportRegistry};
    pub use crate::error::{ErrorKind, ProbeError, ProbeResult};
    pub use crate::report::{LineSink, MemorySink, ReportEvent, ReportSink, TracingSink};
    pub use crate::types::{
        AttributeId, ClientConfig, DataValue, EndpointDescription, NodeId, ReadValueId,
        SecurityMode, StatusCode, TimestampsToReturn, Variant,
    };
    pub use crate::workflow::{Workflow, WorkflowOutcome, WorkflowState};
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
