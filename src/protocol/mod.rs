//! # Protocol Layer
//!
//! Message types for the line protocol and routing of decoded requests to
//! the package registry.
//!
//! Parsing is purely syntactic: an unrecognized command token decodes fine
//! and is rejected by the [`dispatcher::Dispatcher`] instead.

pub mod dispatcher;
pub mod message;
