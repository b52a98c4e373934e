//! WebSocket layer: hub and browser client sockets.
//!
//! - `GET /hub`: hubs authenticate in-band with a `hub_connect` handshake,
//!   then stream telemetry, health, device events, and task status.
//! - `GET /ws/client`: browsers authenticate with a bearer token, then
//!   manage `(hub, port)` subscriptions and receive relayed events.
//!
//! Every socket is split into a receive loop and a single writer task
//! (see [`outbound`]).

pub mod client_connection;
pub mod handler;
pub mod hub_connection;
pub mod messages;
pub mod outbound;
