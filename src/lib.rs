//! # Package Indexer
//!
//! A network-accessible registry of installable packages and their
//! dependencies, served over a newline-delimited TCP protocol.
//!
//! ## Protocol
//! ```text
//! INDEX|<package>|<dep1>,<dep2>,...\n    add a package once its dependencies exist
//! REMOVE|<package>|\n                    remove a package nothing depends on
//! QUERY|<package>|\n                     check whether a package is indexed
//! ```
//! Every request is answered with `OK\n`, `FAIL\n` or `ERROR\n`.
//!
//! ## Architecture
//! - [`core`]: line framing codec and the package data model
//! - [`protocol`]: request/response messages and command dispatch
//! - [`registry`]: dependency-aware, thread-safe package store
//! - [`service`]: TCP server, per-connection tasks, shutdown and client
//! - [`config`], [`error`], [`utils`]: configuration, errors, logging and metrics
//!
//! ## Example
//! ```rust,no_run
//! use package_indexer::config::ServerConfig;
//! use package_indexer::service::server::Server;
//!
//! #[tokio::main]
//! async fn main() -> package_indexer::error::Result<()> {
//!     let server = Server::bind(ServerConfig::default()).await?;
//!     server.run().await
//! }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod service;
pub mod utils;

pub use crate::core::package::Package;
pub use crate::error::{IndexerError, Result};
pub use crate::protocol::message::{Command, Request, Response};
pub use crate::registry::{PackageIndex, Registry, Status};
