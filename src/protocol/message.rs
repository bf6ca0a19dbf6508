//! Request and response messages of the line protocol.
//!
//! ```text
//! request  := COMMAND '|' NAME '|' [DEP (',' DEP)*] '\n'
//! response := "OK\n" | "FAIL\n" | "ERROR\n"
//! ```

use crate::core::package::Package;
use crate::error::{IndexerError, Result};
use crate::registry::Status;
use std::fmt;

/// Terminator every line must end with
pub const LINE_TERMINATOR: char = '\n';

/// Reserved field separator
pub const FIELD_SEPARATOR: char = '|';

/// Separator between dependency names in the third field
pub const DEPS_SEPARATOR: char = ',';

/// Minimum number of field separators in a well-formed line
const MIN_SEPARATORS: usize = 2;

/// Maximum number of fields in a well-formed line
const MAX_FIELDS: usize = 3;

/// Command token carried in the first field.
///
/// Unknown tokens are preserved so that rejection happens at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Command {
    Index,
    Remove,
    Query,
    Unknown(String),
}

impl Command {
    pub fn as_str(&self) -> &str {
        match self {
            Command::Index => "INDEX",
            Command::Remove => "REMOVE",
            Command::Query => "QUERY",
            Command::Unknown(token) => token,
        }
    }
}

impl From<&str> for Command {
    fn from(token: &str) -> Self {
        match token {
            "INDEX" => Command::Index,
            "REMOVE" => Command::Remove,
            "QUERY" => Command::Query,
            other => Command::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded request line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub command: Command,
    pub package: Package,
}

impl Request {
    pub fn new(command: Command, package: Package) -> Self {
        Self { command, package }
    }

    /// Decode one protocol line.
    ///
    /// The line must still carry its trailing newline; a line without it is
    /// treated as truncated and reported as [`IndexerError::MalformedMessage`].
    /// Surrounding whitespace (including a `\r` before the newline) is ignored.
    pub fn parse(line: &str) -> Result<Self> {
        if !line.ends_with(LINE_TERMINATOR) {
            return Err(IndexerError::MalformedMessage);
        }

        if line.matches(FIELD_SEPARATOR).count() < MIN_SEPARATORS {
            return Err(IndexerError::MalformedMessage);
        }

        let fields: Vec<&str> = line.trim().split(FIELD_SEPARATOR).collect();
        if fields.len() > MAX_FIELDS {
            return Err(IndexerError::MalformedMessage);
        }

        let command = fields[0];
        if command.is_empty() {
            return Err(IndexerError::MissingCommand);
        }

        let name = fields.get(1).copied().unwrap_or_default();
        if name.is_empty() {
            return Err(IndexerError::MissingPackageName);
        }

        let deps: Vec<&str> = match fields.get(2) {
            Some(list) if !list.is_empty() => list.split(DEPS_SEPARATOR).collect(),
            _ => Vec::new(),
        };

        Ok(Self {
            command: Command::from(command),
            package: Package::with_deps(name, deps),
        })
    }

    /// Encode this request as a protocol line, newline included
    pub fn to_line(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}{}",
            self.command,
            self.package.name(),
            self.package.deps().join(","),
            LINE_TERMINATOR,
            sep = FIELD_SEPARATOR,
        )
    }
}

/// Status line sent back for every request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Response {
    Ok,
    Fail,
    Error,
}

impl Response {
    /// Literal wire text, newline included
    pub const fn as_wire(&self) -> &'static str {
        match self {
            Response::Ok => "OK\n",
            Response::Fail => "FAIL\n",
            Response::Error => "ERROR\n",
        }
    }

    /// Decode a status line received from a server
    pub fn parse(line: &str) -> Result<Self> {
        match line.trim_end_matches(['\r', '\n']) {
            "OK" => Ok(Response::Ok),
            "FAIL" => Ok(Response::Fail),
            "ERROR" => Ok(Response::Error),
            other => Err(IndexerError::UnexpectedResponse(other.to_string())),
        }
    }
}

impl From<Status> for Response {
    fn from(status: Status) -> Self {
        match status {
            Status::Ok => Response::Ok,
            Status::Fail => Response::Fail,
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire().trim_end())
    }
}
