//! Domain layer: identifiers, session registry, and event store.
//!
//! This module contains the relay's shared state: the registry of live hub
//! and client sessions, the per-session outbound handle, per-client
//! subscription sets, the bounded per-hub event history, and the
//! [`Broadcaster`] that fans hub events out to clients.

pub mod broadcast;
pub mod event_store;
pub mod ids;
pub mod records;
pub mod session;
pub mod session_registry;
pub mod subscription;

pub use broadcast::{BroadcastReport, Broadcaster};
pub use event_store::EventStore;
pub use ids::{ClientId, HubId, PortId, Subscription};
pub use session::{ClientSession, HubSession, HubSummary, Outbound, OutboundFrame, SendFailure};
pub use session_registry::SessionRegistry;
pub use subscription::SubscriptionSet;
