use std::{fmt, sync::Arc};

use bytes::Bytes;

use crate::PreparedCommand;

/// Service type of a TC transfer frame
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum FrameType {
    /// Sequence-controlled data, acknowledged through the CLCW
    Ad,
    /// Expedited data, bypassing the FARM sequence check
    Bd,
    /// Expedited control command for the FARM (Unlock or Set V(R))
    Bc,
}

/// Control commands carried by BC frames
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ControlCommand {
    /// Take the FARM out of lockout
    Unlock,
    /// Set the FARM receiver frame sequence number V(R)
    SetVr(u8),
}

impl ControlCommand {
    /// Data field of the BC frame, per CCSDS 232.0-B-3 section 4.1.3.3
    pub fn encode(&self) -> Bytes {
        match *self {
            Self::Unlock => Bytes::from_static(&[0x00]),
            Self::SetVr(vr) => Bytes::copy_from_slice(&[0x82, 0x00, vr]),
        }
    }
}

/// A TC transfer frame as handed to the transmission channel
///
/// Frames are shared: the sent queue keeps an `Arc` to every outstanding AD frame and a
/// retransmission hands out the same frame again. Byte-level encoding (header, segment header,
/// error control) is left to the channel.
#[derive(Clone, PartialEq, Eq)]
pub struct TcTransferFrame {
    vc_id: u8,
    seq: u8,
    frame_type: FrameType,
    commands: Vec<Arc<PreparedCommand>>,
    control: Option<ControlCommand>,
}

impl TcTransferFrame {
    pub(crate) fn ad(vc_id: u8, seq: u8, commands: Vec<Arc<PreparedCommand>>) -> Self {
        Self {
            vc_id,
            seq,
            frame_type: FrameType::Ad,
            commands,
            control: None,
        }
    }

    pub(crate) fn bd(vc_id: u8, command: Arc<PreparedCommand>) -> Self {
        Self {
            vc_id,
            seq: 0,
            frame_type: FrameType::Bd,
            commands: vec![command],
            control: None,
        }
    }

    pub(crate) fn bc(vc_id: u8, control: ControlCommand) -> Self {
        Self {
            vc_id,
            seq: 0,
            frame_type: FrameType::Bc,
            commands: Vec::new(),
            control: Some(control),
        }
    }

    /// Virtual channel the frame belongs to
    pub fn vc_id(&self) -> u8 {
        self.vc_id
    }

    /// Frame sequence number N(S)
    ///
    /// Only meaningful for AD frames; BD and BC frames carry zero.
    pub fn seq(&self) -> u8 {
        self.seq
    }

    /// Service type
    pub fn frame_type(&self) -> FrameType {
        self.frame_type
    }

    /// Value of the bypass flag in the frame header
    pub fn is_bypass(&self) -> bool {
        self.frame_type != FrameType::Ad
    }

    /// Value of the control command flag in the frame header
    pub fn is_cmd_control(&self) -> bool {
        self.frame_type == FrameType::Bc
    }

    /// Commands carried by the frame, in order
    pub fn commands(&self) -> &[Arc<PreparedCommand>] {
        &self.commands
    }

    /// The control command of a BC frame
    pub fn control(&self) -> Option<ControlCommand> {
        self.control
    }

    /// The frame data field: concatenated command payloads, or the encoded control command
    pub fn data(&self) -> Bytes {
        if let Some(control) = self.control {
            return control.encode();
        }
        match self.commands.as_slice() {
            [single] => single.payload().clone(),
            commands => {
                let mut data = Vec::with_capacity(commands.iter().map(|c| c.len()).sum());
                for command in commands {
                    data.extend_from_slice(command.payload());
                }
                data.into()
            }
        }
    }
}

impl fmt::Debug for TcTransferFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("TcTransferFrame");
        s.field("vc_id", &self.vc_id)
            .field("type", &self.frame_type)
            .field("seq", &self.seq);
        match self.control {
            Some(control) => s.field("control", &control),
            None => s.field(
                "commands",
                &self.commands.iter().map(|c| c.id()).collect::<Vec<_>>(),
            ),
        };
        s.finish()
    }
}
