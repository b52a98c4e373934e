//! Service layer: business logic orchestration.
//!
//! [`RelayService`] applies hub frames to the event store and fans them
//! out through the [`super::domain::Broadcaster`]. [`CommandDispatcher`]
//! routes commands from REST and browser clients to hub sockets.

pub mod command_service;
pub mod relay_service;

pub use command_service::CommandDispatcher;
pub use relay_service::RelayService;
