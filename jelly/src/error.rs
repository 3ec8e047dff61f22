//! Error type shared by the row layout, the codec, and the transport helpers.

use std::fmt;

/// Which lookup table an error or update refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TableKind {
    Prefix,
    Name,
    Datatype,
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableKind::Prefix => write!(f, "prefix"),
            TableKind::Name => write!(f, "name"),
            TableKind::Datatype => write!(f, "datatype"),
        }
    }
}

/// Errors raised while encoding or decoding a Jelly stream.
///
/// Every variant is terminal for the stream it came from: the encoder or
/// decoder must be reset (or discarded) before it is used again.
#[derive(Debug)]
pub enum JellyError {
    /// The peer (or the caller) broke the stream contract: unknown table
    /// id, elision with nothing to repeat, a term kind the stream options
    /// forbid, or rows in the wrong order.
    Protocol(String),
    /// A transport unit could not be parsed into a row.
    Malformed(String),
    /// A lookup table would grow past its configured ceiling.
    ResourceLimit { table: TableKind, limit: u32 },
    /// Underlying I/O error from a transport adapter.
    Io(std::io::Error),
}

impl fmt::Display for JellyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JellyError::Protocol(m) => write!(f, "protocol violation: {}", m),
            JellyError::Malformed(m) => write!(f, "malformed row: {}", m),
            JellyError::ResourceLimit { table, limit } => {
                write!(f, "{} table exceeds its limit of {} entries", table, limit)
            }
            JellyError::Io(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for JellyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            JellyError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for JellyError {
    fn from(e: std::io::Error) -> Self {
        JellyError::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, JellyError>;
