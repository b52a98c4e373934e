//! # hub-relay
//!
//! WebSocket relay between remote device hubs and browser clients.
//!
//! Hubs connect over a WebSocket, authenticate with a device token and
//! stream serial telemetry, health reports, device events and task status.
//! Browsers subscribe to `(hub, port)` pairs and receive the relevant
//! frames live. Commands flow the other way: a client socket or the REST
//! API turns a request into a command frame queued on the hub's socket.
//!
//! ## Architecture
//!
//! ```text
//! Hubs (WS /hub)          Browsers (WS /ws/client, REST /api/hubs)
//!     │                       │
//!     ├── hub_connection      ├── client_connection / REST handlers
//!     │        │              │        │
//!     │   RelayService        │   CommandDispatcher (service/)
//!     │        │              │        │
//!     ├── EventStore ─────────┼── SessionRegistry (domain/)
//!     │        │              │
//!     └── Broadcaster ────────┘
//! ```

pub mod api;
pub mod app;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod ws;
