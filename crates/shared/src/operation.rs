//! Operation tags carried in the `operation` field of every text frame.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Discriminator for a message's semantic kind.
///
/// `Open`, `Closed` and `Error` are synthetic: they come from the socket's
/// own lifecycle rather than from the server. Tags the client does not know
/// about are preserved in `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operation {
    ConnectionOpened,
    Acknowledgement,
    Kill,
    Load,
    Read,
    TransferComplete,
    NoHandler,
    Open,
    Closed,
    Error,
    Unknown(String),
}

impl Operation {
    pub fn as_str(&self) -> &str {
        match self {
            Operation::ConnectionOpened => "connection_opened",
            Operation::Acknowledgement => "acknowledgement",
            Operation::Kill => "kill",
            Operation::Load => "load",
            Operation::Read => "read",
            Operation::TransferComplete => "transfer_complete",
            Operation::NoHandler => "no_handler",
            Operation::Open => "open",
            Operation::Closed => "closed",
            Operation::Error => "error",
            Operation::Unknown(tag) => tag,
        }
    }

    /// Whether this tag is produced by the socket lifecycle instead of the server.
    pub fn is_synthetic(&self) -> bool {
        matches!(self, Operation::Open | Operation::Closed | Operation::Error)
    }
}

impl From<&str> for Operation {
    fn from(tag: &str) -> Self {
        match tag {
            "connection_opened" => Operation::ConnectionOpened,
            "acknowledgement" => Operation::Acknowledgement,
            "kill" => Operation::Kill,
            "load" => Operation::Load,
            "read" => Operation::Read,
            "transfer_complete" => Operation::TransferComplete,
            "no_handler" => Operation::NoHandler,
            "open" => Operation::Open,
            "closed" => Operation::Closed,
            "error" => Operation::Error,
            other => Operation::Unknown(other.to_string()),
        }
    }
}

impl From<String> for Operation {
    fn from(tag: String) -> Self {
        Operation::from(tag.as_str())
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Operation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Operation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(Operation::from(tag))
    }
}
