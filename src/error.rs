//! # Error Types
//!
//! Error handling for the package index server.
//!
//! This module defines every error variant that can surface while serving
//! clients, from low-level I/O failures to malformed protocol lines.
//!
//! ## Error Categories
//! - **I/O Errors**: Socket and file system failures
//! - **Parse Errors**: Malformed lines, missing command or package name
//! - **Dispatch Errors**: Well-formed lines carrying an unknown command
//! - **Configuration Errors**: Invalid or unreadable configuration
//!
//! The registry itself never returns an error. Dependency violations are a
//! normal `FAIL` outcome, not a fault.
//!
//! ## Example Usage
//! ```rust
//! use package_indexer::error::IndexerError;
//! use package_indexer::protocol::message::Request;
//! use tracing::{error, info};
//!
//! match Request::parse("QUERY|zlib\n") {
//!     Ok(req) => info!(package = %req.package.name(), "Parsed request"),
//!     Err(e @ IndexerError::MalformedMessage) => error!(error = %e, "Rejected line"),
//!     Err(e) => error!(error = %e, "Unexpected failure"),
//! }
//! ```

use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Parse errors
    pub const ERR_MALFORMED_MESSAGE: &str = "Malformed message structure";
    pub const ERR_MISSING_COMMAND: &str = "Missing command";
    pub const ERR_MISSING_PACKAGE_NAME: &str = "Missing package name";

    /// Dispatcher-related error messages
    pub const ERR_DISPATCHER_WRITE_LOCK: &str = "Failed to acquire write lock on dispatcher";
    pub const ERR_DISPATCHER_READ_LOCK: &str = "Failed to acquire read lock on dispatcher";
}

// IndexerError is the primary error type for all server and client operations
#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed message structure")]
    MalformedMessage,

    #[error("Missing command")]
    MissingCommand,

    #[error("Missing package name")]
    MissingPackageName,

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Line exceeds maximum length of {limit} bytes")]
    LineTooLong { limit: usize },

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Unexpected response: {0:?}")]
    UnexpectedResponse(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Custom error: {0}")]
    Custom(String),
}

impl IndexerError {
    /// Whether this error was produced while decoding or dispatching a line,
    /// as opposed to a transport failure.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedMessage
                | Self::MissingCommand
                | Self::MissingPackageName
                | Self::UnknownCommand(_)
                | Self::LineTooLong { .. }
        )
    }
}

/// Type alias for Results using IndexerError
pub type Result<T> = std::result::Result<T, IndexerError>;
