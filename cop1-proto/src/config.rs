use std::{fmt, num::TryFromIntError};

use thiserror::Error;

use crate::{Duration, MAX_VC_ID};

/// Parameters governing the FOP-1 state machine of one virtual channel
///
/// Default values follow common mission practice: a 3 second T1, three transmissions per frame
/// and suspension (rather than termination) when T1 runs out. The transmission limit, timeout
/// type, window width and T1 may also be changed at runtime through the FOP directives.
#[derive(Clone)]
pub struct FopConfig {
    pub(crate) vc_id: u8,
    pub(crate) t1_initial: Duration,
    pub(crate) transmission_limit: u32,
    pub(crate) timeout_type: TimeoutType,
    pub(crate) window_width: u8,
    pub(crate) bd_absolute_priority: bool,
    pub(crate) max_frame_data_length: usize,
    pub(crate) multiple_commands_per_frame: bool,
    pub(crate) out_queue_size: usize,
    pub(crate) initial_clcw_wait: Option<Duration>,
}

impl FopConfig {
    /// Default configuration for the TC virtual channel `vc_id`
    pub fn new(vc_id: u8) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.vc_id(vc_id)?;
        Ok(config)
    }

    /// Virtual channel identifier, 0 to 63
    ///
    /// CLCWs reporting on another virtual channel are ignored.
    pub fn vc_id(&mut self, value: u8) -> Result<&mut Self, ConfigError> {
        if value > MAX_VC_ID {
            return Err(ConfigError::OutOfBounds);
        }
        self.vc_id = value;
        Ok(self)
    }

    /// Timer_Initial_Value, the duration of T1
    ///
    /// Must be nonzero. Should cover the round trip to the spacecraft plus the CLCW reporting
    /// interval, otherwise frames get retransmitted before the peer had a chance to acknowledge.
    pub fn t1_initial(&mut self, value: Duration) -> Result<&mut Self, ConfigError> {
        if value.is_zero() {
            return Err(ConfigError::OutOfBounds);
        }
        self.t1_initial = value;
        Ok(self)
    }

    /// Transmission_Limit, the maximum number of transmissions of a frame, the first included
    ///
    /// Must be at least 1. With a limit of 1 any retransmission request from the peer raises
    /// the `LIMIT` alert.
    pub fn transmission_limit(&mut self, value: u32) -> Result<&mut Self, ConfigError> {
        if value == 0 {
            return Err(ConfigError::OutOfBounds);
        }
        self.transmission_limit = value;
        Ok(self)
    }

    /// Timeout_Type, what to do when T1 expires with the transmission limit reached
    pub fn timeout_type(&mut self, value: TimeoutType) -> &mut Self {
        self.timeout_type = value;
        self
    }

    /// FOP_Sliding_Window_Width (K), the maximum number of unacknowledged AD frames
    ///
    /// Must be between 1 and 255. A width of 1 gives stop-and-wait operation.
    pub fn window_width(&mut self, value: u32) -> Result<&mut Self, ConfigError> {
        let value = u8::try_from(value)?;
        if value == 0 {
            return Err(ConfigError::OutOfBounds);
        }
        self.window_width = value;
        Ok(self)
    }

    /// Send bypass commands ahead of everything waiting for the AD service
    ///
    /// When disabled (the default), bypass commands submitted during normal AD operation keep
    /// their position relative to AD commands. They always go out immediately while the AD
    /// service is not running.
    pub fn bd_absolute_priority(&mut self, value: bool) -> &mut Self {
        self.bd_absolute_priority = value;
        self
    }

    /// Maximum number of command bytes in the data field of one frame
    pub fn max_frame_data_length(&mut self, value: usize) -> Result<&mut Self, ConfigError> {
        if value == 0 {
            return Err(ConfigError::OutOfBounds);
        }
        self.max_frame_data_length = value;
        Ok(self)
    }

    /// Pack as many waiting commands as fit into each AD frame
    ///
    /// Disabled by default: every AD frame carries exactly one command.
    pub fn multiple_commands_per_frame(&mut self, value: bool) -> &mut Self {
        self.multiple_commands_per_frame = value;
        self
    }

    /// Capacity of the queue of frames waiting for the transmission channel
    pub fn out_queue_size(&mut self, value: usize) -> Result<&mut Self, ConfigError> {
        if value == 0 {
            return Err(ConfigError::OutOfBounds);
        }
        self.out_queue_size = value;
        Ok(self)
    }

    /// Initiate the AD service with CLCW check as soon as the engine starts
    ///
    /// The value is how long to wait for the first CLCW. `None` (the default) leaves the
    /// machine in the Initial state until a directive arrives.
    pub fn initial_clcw_wait(&mut self, value: Option<Duration>) -> &mut Self {
        self.initial_clcw_wait = value;
        self
    }

    /// Get the virtual channel identifier
    pub fn get_vc_id(&self) -> u8 {
        self.vc_id
    }

    /// Get the current T1 duration
    pub fn get_t1_initial(&self) -> Duration {
        self.t1_initial
    }

    /// Get the current transmission limit
    pub fn get_transmission_limit(&self) -> u32 {
        self.transmission_limit
    }

    /// Get the current timeout type
    pub fn get_timeout_type(&self) -> TimeoutType {
        self.timeout_type
    }

    /// Get the current window width
    pub fn get_window_width(&self) -> u8 {
        self.window_width
    }

    /// Get the configured initial CLCW wait
    pub fn get_initial_clcw_wait(&self) -> Option<Duration> {
        self.initial_clcw_wait
    }
}

impl Default for FopConfig {
    fn default() -> Self {
        Self {
            vc_id: 0,
            t1_initial: Duration::from_secs(3),
            transmission_limit: 3,
            timeout_type: TimeoutType::Suspend,
            window_width: 10,
            bd_absolute_priority: false,
            max_frame_data_length: 1019, // 1024 byte frame minus the 5 byte primary header
            multiple_commands_per_frame: false,
            out_queue_size: 20,
            initial_clcw_wait: None,
        }
    }
}

impl fmt::Debug for FopConfig {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("FopConfig")
            .field("vc_id", &self.vc_id)
            .field("t1_initial", &self.t1_initial)
            .field("transmission_limit", &self.transmission_limit)
            .field("timeout_type", &self.timeout_type)
            .field("window_width", &self.window_width)
            .field("bd_absolute_priority", &self.bd_absolute_priority)
            .field("max_frame_data_length", &self.max_frame_data_length)
            .field("multiple_commands_per_frame", &self.multiple_commands_per_frame)
            .field("out_queue_size", &self.out_queue_size)
            .field("initial_clcw_wait", &self.initial_clcw_wait)
            .finish()
    }
}

/// Behavior when T1 expires and the transmission limit has been reached
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TimeoutType {
    /// Raise the `T1` alert and abort the AD service (Timeout_Type 0)
    Alert,
    /// Suspend the AD service, keeping the sent queue, until resumed (Timeout_Type 1)
    Suspend,
}

impl TryFrom<u8> for TimeoutType {
    type Error = ConfigError;
    fn try_from(value: u8) -> Result<Self, ConfigError> {
        match value {
            0 => Ok(Self::Alert),
            1 => Ok(Self::Suspend),
            _ => Err(ConfigError::OutOfBounds),
        }
    }
}

impl From<TimeoutType> for u8 {
    fn from(x: TimeoutType) -> Self {
        match x {
            TimeoutType::Alert => 0,
            TimeoutType::Suspend => 1,
        }
    }
}

/// Errors in the configuration of a FOP
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// Value exceeds supported bounds
    #[error("value exceeds supported bounds")]
    OutOfBounds,
}

impl From<TryFromIntError> for ConfigError {
    fn from(_: TryFromIntError) -> Self {
        Self::OutOfBounds
    }
}
