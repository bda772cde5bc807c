//! SQLite backend for the Clubhouse workflow engine.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every conditional write is one
//! transaction inside a single `call`, so a cancelled request can never leave
//! half a transition behind.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
