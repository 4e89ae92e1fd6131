use std::fmt;

use bytes::Bytes;

/// Identifier of a command, chosen by the command source
///
/// The FOP never interprets it; it only reports it back in [`Event`](crate::Event)s so that the
/// command source can correlate acknowledgements and failures.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct CommandId(pub u64);

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cmd-{}", self.0)
    }
}

impl From<u64> for CommandId {
    fn from(x: u64) -> Self {
        Self(x)
    }
}

/// A telecommand ready to be placed into a transfer frame
///
/// The payload is the fully post-processed binary form of the command. Frames hold commands by
/// reference, so a retransmitted frame carries the very same commands as the original.
#[derive(Clone, PartialEq, Eq)]
pub struct PreparedCommand {
    id: CommandId,
    payload: Bytes,
    bypass: bool,
}

impl PreparedCommand {
    /// Create a command that goes through the acknowledged (AD) service
    pub fn new(id: impl Into<CommandId>, payload: impl Into<Bytes>) -> Self {
        Self {
            id: id.into(),
            payload: payload.into(),
            bypass: false,
        }
    }

    /// Create a command sent in a BD frame, bypassing sequence control
    pub fn bypass(id: impl Into<CommandId>, payload: impl Into<Bytes>) -> Self {
        Self {
            bypass: true,
            ..Self::new(id, payload)
        }
    }

    /// The identifier given by the command source
    pub fn id(&self) -> CommandId {
        self.id
    }

    /// Binary content of the command
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Whether the command asked for the BD service
    pub fn is_bypass(&self) -> bool {
        self.bypass
    }

    pub(crate) fn len(&self) -> usize {
        self.payload.len()
    }
}

impl fmt::Debug for PreparedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreparedCommand")
            .field("id", &self.id)
            .field("len", &self.payload.len())
            .field("bypass", &self.bypass)
            .finish()
    }
}
