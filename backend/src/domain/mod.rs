//! Domain entities, validation, and ports.
//!
//! Everything in this module is transport and storage agnostic. The HTTP
//! adapter lives in `inbound::http`; the Diesel and in-memory adapters
//! live in `outbound`.

pub mod auth;
pub mod catalogue;
pub mod error;
pub mod image;
pub mod ports;
pub mod recipe;
pub mod shopping_list;
pub mod user;

pub use self::error::{Error, ErrorCode};
