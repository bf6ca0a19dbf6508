//! # Service Layer
//!
//! The network-facing side of the package index.
//!
//! ## Components
//! - **Server**: Accept loop, one task per connection, signal-driven shutdown
//! - **Connection**: Read/decode/dispatch/encode/write loop for one client
//! - **Reporter**: Shared channel connection tasks surface errors through
//! - **Client**: Line-protocol client used by tools and tests
//!
//! All connections share a single [`crate::registry::Registry`] through an
//! `Arc`; no registry state lives in globals.

pub mod client;
pub mod connection;
pub mod reporter;
pub mod server;
