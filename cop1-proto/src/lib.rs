//! Low-level protocol logic for the CCSDS COP-1 frame operation procedure
//!
//! cop1-proto contains a fully deterministic implementation of FOP-1, the sending side of the
//! Communications Operation Procedure-1 (CCSDS 232.1-B-2). It contains no I/O and does not read
//! the clock: every operation that may start or evaluate the T1 timer takes the current time as an
//! argument. Most users may want to use the futures-based `cop1` crate instead, which drives a
//! [`Fop`] from a dedicated task.
//!
//! The most important type is [`Fop`], which holds the protocol state of a single TC virtual
//! channel: the send sequence variable V(S), the window of sent but unacknowledged frames, the
//! queue of commands waiting for a frame and the bounded queue of frames waiting for the
//! transmission channel. The peer (FARM-1) reports its progress through [`Clcw`]s, which the
//! machine reconciles against its window.
//!
//! Driving a [`Fop`] follows a simple pattern: feed it commands, CLCWs and timeouts, then drain
//! [`Fop::poll_transmit`] for frames to send and [`Fop::poll`] for [`Event`]s, and arrange for
//! [`Fop::handle_timeout`] to be called at [`Fop::poll_timeout`].
#![warn(missing_docs)]
#![warn(unreachable_pub)]
#![warn(clippy::use_self)]

pub use std::time::{Duration, Instant};

mod clcw;
pub use crate::clcw::Clcw;

mod command;
pub use crate::command::{CommandId, PreparedCommand};

mod config;
pub use crate::config::{ConfigError, FopConfig, TimeoutType};

mod frame;
pub use crate::frame::{ControlCommand, FrameType, TcTransferFrame};

mod fop;
pub use crate::fop::{AlertType, Event, FailReason, Fop, FopError, State, Status};


/// Largest virtual channel identifier that fits in a TC frame header or a CLCW
pub const MAX_VC_ID: u8 = 63;
