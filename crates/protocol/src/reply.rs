//! Text replies to info requests (`INDEX`, `INFO <name>`).

use std::fmt;

/// Reply sent for a command with an unknown verb.
pub const UNKNOWN_COMMAND_REPLY: &str = "Unknown command";

const OK_PREFIX: &str = "ok";
const NOT_FOUND: &str = "error";

/// Server answer to an info request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoReply {
    /// The resource exists and spans this many chunks.
    Found { chunk_count: u32 },
    /// The resource does not exist.
    NotFound,
}

/// Errors from parsing an info reply.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum InfoReplyError {
    #[error("reply is not valid UTF-8")]
    InvalidUtf8,

    #[error("unrecognized info reply: {0:?}")]
    Unrecognized(String),
}

impl InfoReply {
    /// Parses an info reply datagram (`"ok <n>"` or `"error"`).
    pub fn parse(datagram: &[u8]) -> Result<Self, InfoReplyError> {
        let text = std::str::from_utf8(datagram).map_err(|_| InfoReplyError::InvalidUtf8)?;
        let text = text.trim();

        if text == NOT_FOUND {
            return Ok(InfoReply::NotFound);
        }

        let mut tokens = text.split_whitespace();
        match (tokens.next(), tokens.next(), tokens.next()) {
            (Some(OK_PREFIX), Some(count), None) => count
                .parse::<u32>()
                .map(|chunk_count| InfoReply::Found { chunk_count })
                .map_err(|_| InfoReplyError::Unrecognized(text.to_string())),
            _ => Err(InfoReplyError::Unrecognized(text.to_string())),
        }
    }

    /// Encodes the reply as a datagram payload.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for InfoReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InfoReply::Found { chunk_count } => write!(f, "{OK_PREFIX} {chunk_count}"),
            InfoReply::NotFound => f.write_str(NOT_FOUND),
        }
    }
}
