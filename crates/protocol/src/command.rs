//! Text commands sent from client to server.
//!
//! ```text
//! INDEX                    metadata of the listing resource
//! FETCH_INDEX <seq>        one chunk of the listing resource
//! INFO <name>              metadata of a named resource
//! FETCH <name> <seq>       one chunk of a named resource
//! ```
//!
//! `FETCH_FILE` is accepted as an alias of `FETCH`. Names may contain spaces:
//! `INFO` takes the rest of the line, `FETCH` takes everything between the
//! verb and the trailing sequence number.

use std::fmt;

const VERB_INDEX: &str = "INDEX";
const VERB_FETCH_INDEX: &str = "FETCH_INDEX";
const VERB_INFO: &str = "INFO";
const VERB_FETCH: &str = "FETCH";
const VERB_FETCH_FILE: &str = "FETCH_FILE";

/// A resource the server can describe and serve in chunks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceId {
    /// The generated listing of available resources.
    Listing,
    /// A named resource under the server root.
    Named(String),
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceId::Listing => f.write_str("<index>"),
            ResourceId::Named(name) => f.write_str(name),
        }
    }
}

/// A parsed client command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Ask for the chunk count of a resource.
    Info(ResourceId),
    /// Ask for chunk `seq` of a resource.
    Fetch { resource: ResourceId, seq: u32 },
}

/// Errors from parsing a command datagram.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("command is not valid UTF-8")]
    InvalidUtf8,

    #[error("empty command")]
    Empty,

    #[error("unknown command: {0}")]
    Unknown(String),

    #[error("{verb}: missing {what}")]
    MissingArgument {
        verb: &'static str,
        what: &'static str,
    },

    #[error("{verb}: unexpected argument {arg:?}")]
    UnexpectedArgument { verb: &'static str, arg: String },

    #[error("{verb}: invalid sequence number {value:?}")]
    InvalidSequence { verb: &'static str, value: String },
}

impl Command {
    /// Parses a raw command datagram.
    pub fn parse(datagram: &[u8]) -> Result<Self, CommandError> {
        let text = std::str::from_utf8(datagram).map_err(|_| CommandError::InvalidUtf8)?;
        Self::parse_str(text)
    }

    /// Parses command text. Surrounding whitespace is ignored.
    pub fn parse_str(text: &str) -> Result<Self, CommandError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CommandError::Empty);
        }

        let (verb, rest) = match text.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (text, ""),
        };

        match verb {
            VERB_INDEX => {
                if !rest.is_empty() {
                    return Err(CommandError::UnexpectedArgument {
                        verb: VERB_INDEX,
                        arg: rest.to_string(),
                    });
                }
                Ok(Command::Info(ResourceId::Listing))
            }
            VERB_FETCH_INDEX => {
                if rest.is_empty() {
                    return Err(CommandError::MissingArgument {
                        verb: VERB_FETCH_INDEX,
                        what: "sequence number",
                    });
                }
                if rest.contains(char::is_whitespace) {
                    return Err(CommandError::UnexpectedArgument {
                        verb: VERB_FETCH_INDEX,
                        arg: rest.to_string(),
                    });
                }
                let seq = parse_seq(VERB_FETCH_INDEX, rest)?;
                Ok(Command::Fetch {
                    resource: ResourceId::Listing,
                    seq,
                })
            }
            VERB_INFO => {
                if rest.is_empty() {
                    return Err(CommandError::MissingArgument {
                        verb: VERB_INFO,
                        what: "resource name",
                    });
                }
                Ok(Command::Info(ResourceId::Named(rest.to_string())))
            }
            VERB_FETCH | VERB_FETCH_FILE => {
                let verb = if verb == VERB_FETCH {
                    VERB_FETCH
                } else {
                    VERB_FETCH_FILE
                };
                let (name, seq) = match rest.rsplit_once(char::is_whitespace) {
                    Some((name, seq)) if !name.trim().is_empty() => (name.trim(), seq),
                    _ => {
                        return Err(CommandError::MissingArgument {
                            verb,
                            what: "resource name and sequence number",
                        });
                    }
                };
                let seq = parse_seq(verb, seq)?;
                Ok(Command::Fetch {
                    resource: ResourceId::Named(name.to_string()),
                    seq,
                })
            }
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }

    /// Encodes the command as a datagram payload.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Info(ResourceId::Listing) => f.write_str(VERB_INDEX),
            Command::Info(ResourceId::Named(name)) => write!(f, "{VERB_INFO} {name}"),
            Command::Fetch {
                resource: ResourceId::Listing,
                seq,
            } => write!(f, "{VERB_FETCH_INDEX} {seq}"),
            Command::Fetch {
                resource: ResourceId::Named(name),
                seq,
            } => write!(f, "{VERB_FETCH} {name} {seq}"),
        }
    }
}

fn parse_seq(verb: &'static str, value: &str) -> Result<u32, CommandError> {
    value
        .parse::<u32>()
        .map_err(|_| CommandError::InvalidSequence {
            verb,
            value: value.to_string(),
        })
}
