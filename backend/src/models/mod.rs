//! Data models shared across database access and API handlers.

pub mod attendance;
pub mod employee;
pub mod request;
pub mod viewer;
