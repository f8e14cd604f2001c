//! HTTP inbound adapter exposing REST endpoints.

pub mod catalogue;
pub mod error;
pub mod payloads;
pub mod recipes;
pub mod routes;
pub mod session;
pub mod state;
pub mod subscriptions;
#[cfg(test)]
pub mod test_utils;
pub mod users;

pub use error::ApiResult;
