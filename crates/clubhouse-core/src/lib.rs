//! Core types, trait definitions and the workflow engine for Clubhouse.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::ClubStore`] and
//! [`store::IdempotencyStore`]; transports drive an [`engine::Engine`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod access;
pub mod activity;
pub mod actor;
pub mod application;
pub mod attendance;
pub mod clock;
pub mod collab;
pub mod correlation;
pub mod engine;
pub mod error;
pub mod idempotency;
pub mod leave;
pub mod store;
pub mod validate;
pub mod workflow;

pub use error::{Error, ErrorKind, Result};
