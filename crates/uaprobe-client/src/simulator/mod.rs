// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! A small UA-SC server for tests and demos.
//!
//! The same [`ServerConnection`] state machine sits behind the in-memory
//! [`LoopbackFactory`] and the socket listeners of [`SimulatedServer`], so a
//! fixture behaves identically whichever binding reaches it.
//!
//! # Examples
//!
//! ```
//! use uaprobe_client::simulator::ServerFixture;
//!
//! let fixture = ServerFixture::demo("opc.tcp://127.0.0.1:48040", "opc.ws://127.0.0.1:48043");
//! assert_eq!(fixture.endpoints().len(), 4);
//! assert_eq!(fixture.read_calls(), 0);
//! ```

mod connection;
mod fixture;
mod loopback;
mod server;

pub use connection::{Outcome, ServerConnection, SERVER_MAX_MESSAGE_SIZE};
pub use fixture::{ServerFixture, ServerFixtureBuilder};
pub use loopback::{LoopbackFactory, LoopbackTransport};
pub use server::{ServerHandle, SimulatedServer};
