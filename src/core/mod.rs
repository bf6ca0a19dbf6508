//! # Core Protocol Components
//!
//! Line framing and the package data model.
//!
//! ## Components
//! - **Package**: A named package and its ordered dependency names
//! - **Codec**: Tokio codec splitting a byte stream into newline-terminated lines
//!
//! ## Wire Format
//! ```text
//! INDEX|nginx|pcre,zlib\n   ->   OK\n
//! ```
//!
//! ## Limits
//! - Maximum line length: 64 KiB by default (longer lines are skipped, not buffered)

pub mod codec;
pub mod package;
