//! Outbound adapters: PostgreSQL persistence, filesystem media storage,
//! and the in-memory store used by tests and database-less development.

pub mod media;
pub mod memory;
pub mod persistence;

pub use media::FsMediaStore;
pub use memory::InMemoryStore;
