//! CCSDS COP-1 telecommand uplink engine
//!
//! COP-1, the Communications Operation Procedure-1 (CCSDS 232.1-B-2), provides reliable,
//! in-order delivery of telecommand transfer frames to a spacecraft over a lossy uplink. The
//! ground side runs the frame operation procedure (FOP-1): it numbers AD (acknowledged delivery)
//! frames, keeps a window of frames sent but not yet acknowledged, and retransmits them as directed
//! by the Communications Link Control Words (CLCWs) the spacecraft's FARM-1 reports on the
//! downlink, or when the T1 timer runs out.
//!
//! This crate runs the protocol machine of [cop1-proto](proto) on a tokio task. The entry point
//! is the [`Engine`], one per TC virtual channel:
//!
//! - commands go in through [`Engine::send_command`],
//! - the transmission channel pulls frames with [`Engine::get_frame`] or [`Engine::next_frame`],
//! - the downlink feeds CLCWs through [`Engine::on_clcw`],
//! - operators drive the AD service with the directives (`initiate_ad`, `terminate_ad`,
//!   `resume`, ...),
//! - [`Monitor`]s observe state changes, alerts and command outcomes.
//!
//! Frame encoding, error control and the physical transport are left to the caller.
#![warn(missing_docs)]
#![warn(unreachable_pub)]
#![warn(clippy::use_self)]

mod engine;
mod monitor;

pub use proto::{
    AlertType, Clcw, CommandId, ConfigError, ControlCommand, Event, FailReason, FopConfig,
    FopError, FrameType, PreparedCommand, State, Status, TcTransferFrame, TimeoutType, MAX_VC_ID,
};

pub use crate::engine::{Engine, EngineError};
pub use crate::monitor::Monitor;
