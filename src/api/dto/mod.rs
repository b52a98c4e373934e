//! Data Transfer Objects for REST request/response serialization.
//!
//! Field casing follows the hub wire protocol: envelope fields are
//! camelCase, record fields mirror the stored snake_case names.

pub mod command_dto;
pub mod hub_dto;

pub use command_dto::*;
pub use hub_dto::*;
