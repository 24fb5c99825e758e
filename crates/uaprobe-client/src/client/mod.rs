// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Client-side stages of the workflow.
//!
//! ```text
//! ┌──────────────────┐   Catalog   ┌──────────────┐  EndpointDescription
//! │ DiscoveryClient  │ ──────────▶ │   select()   │ ─────────────┐
//! │ (None security)  │             │ (last match) │              │
//! └──────────────────┘             └──────────────┘              ▼
//!                                                      ┌──────────────────┐
//!          ┌─────────────────┐        Session          │ SessionBootstrap │
//!          │ AttributeReader │ ◀────────────────────── │ (secured channel)│
//!          │  (single Read)  │                         └──────────────────┘
//!          └─────────────────┘
//! ```

mod discovery;
mod read;
mod select;
mod session;

pub use discovery::{Catalog, DiscoveryClient};
pub use read::{AttributeReader, ReadOutcome};
pub use select::{select, select_endpoint, Selection};
pub use session::{Session, SessionBootstrap, SessionState};
