use std::{collections::VecDeque, fmt, sync::Arc};

use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::{
    Clcw, CommandId, ConfigError, ControlCommand, Duration, FopConfig, FrameType, Instant,
    PreparedCommand, TcTransferFrame, TimeoutType,
};

mod out_queue;
use out_queue::OutQueue;

mod sent_queue;
use sent_queue::SentQueue;

/// Protocol state of the FOP-1 machine of a single virtual channel
///
/// Commands, CLCWs, timeouts and directives are fed in; frames for the transmission channel and
/// [`Event`]s for monitors come out. See the [crate documentation](crate) for the driving
/// pattern.
pub struct Fop {
    config: FopConfig,
    state: State,
    /// The state the AD service was suspended in, if any
    suspend_state: Option<State>,
    /// Set by [`Fop::disable`]: every command goes out as a BD frame
    disabled: bool,
    sent_queue: SentQueue,
    /// Commands accepted for the AD service but not yet in a frame
    wait_queue: VecDeque<Arc<PreparedCommand>>,
    out_queue: OutQueue,
    /// No AD frame is waiting in the out queue
    ad_out_ready: bool,
    /// No BC frame is waiting in the out queue
    bc_out_ready: bool,
    pending_bc: Option<PendingBc>,
    /// Transmission_Count
    tx_count: u32,
    /// T1 deadline
    timer: Option<Instant>,
    last_clcw: Option<Clcw>,
    events: VecDeque<Event>,
}

#[derive(Debug)]
struct PendingBc {
    frame: Arc<TcTransferFrame>,
    to_be_retransmitted: bool,
}

impl Fop {
    /// Create a FOP in the Initial state with V(S) = 0
    pub fn new(config: FopConfig) -> Self {
        let out_queue = OutQueue::new(config.out_queue_size);
        Self {
            config,
            state: State::Initial,
            suspend_state: None,
            disabled: false,
            sent_queue: SentQueue::new(),
            wait_queue: VecDeque::new(),
            out_queue,
            ad_out_ready: true,
            bc_out_ready: true,
            pending_bc: None,
            tx_count: 1,
            timer: None,
            last_clcw: None,
            events: VecDeque::new(),
        }
    }

    /// Apply the start-up behavior of the configuration
    ///
    /// Initiates the AD service with CLCW check if an initial CLCW wait is configured.
    pub fn start(&mut self, now: Instant) {
        if let Some(wait) = self.config.initial_clcw_wait {
            if self.state == State::Initial {
                info!(vc = self.config.vc_id, ?wait, "initiating AD service at start-up");
                self.initialize();
                self.set_timer(now, wait);
                self.set_state(State::InitializingWithoutBcFrame);
            }
        }
    }

    /// Current protocol state
    pub fn state(&self) -> State {
        self.state
    }

    /// The active configuration, including parameters changed by directives
    pub fn config(&self) -> &FopConfig {
        &self.config
    }

    /// Snapshot of the machine for status reporting
    pub fn status(&self) -> Status {
        Status {
            state: self.state,
            suspend_state: self.suspend_state,
            cop1_active: !self.disabled,
            v_s: self.sent_queue.v_s(),
            nn_r: self.sent_queue.nn_r(),
            tx_count: self.tx_count,
            wait_queue_len: self.wait_queue.len(),
            sent_queue_len: self.sent_queue.len(),
            out_queue_len: self.out_queue.len(),
            last_clcw: self.last_clcw,
        }
    }

    /// Returns the next time at which `handle_timeout` should be called
    ///
    /// The value returned may change after any other call into the machine.
    pub fn poll_timeout(&self) -> Option<Instant> {
        self.timer
    }

    /// Returns events for monitors
    ///
    /// The machine should be polled for events after every call into it.
    pub fn poll(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    /// Returns the next frame for the transmission channel
    ///
    /// Taking a frame is the point at which it counts as transmitted: T1 is armed for AD and BC
    /// frames and the next AD frame, if any, is prepared.
    pub fn poll_transmit(&mut self, now: Instant) -> Option<Arc<TcTransferFrame>> {
        let frame = self.out_queue.pop()?;
        trace!(seq = frame.seq(), kind = ?frame.frame_type(), "releasing frame");
        match frame.frame_type() {
            FrameType::Ad => {
                self.ad_out_ready = true;
                let seq = frame.seq();
                // No supervision while suspended, resuming restarts T1
                if self.state != State::Initial
                    && self.sent_queue.is_outstanding(seq)
                    && (seq == self.sent_queue.nn_r() || self.timer.is_none())
                {
                    self.start_timer(now);
                }
                if self.state.is_sending_ad() {
                    self.look_for_fdu();
                }
            }
            FrameType::Bc => {
                self.bc_out_ready = true;
                if self.state == State::InitializingWithBcFrame && self.pending_bc.is_some() {
                    self.start_timer(now);
                }
            }
            FrameType::Bd => {}
        }
        self.events.push_back(Event::FrameReleased {
            frame_type: frame.frame_type(),
            seq: frame.seq(),
        });
        Some(frame)
    }

    /// Submit a command for transmission
    ///
    /// Bypass commands are accepted in any state. Other commands need the AD service to be
    /// initiated. Accepted AD commands are reported through [`Event::CommandAcknowledged`] or
    /// [`Event::CommandFailed`] later on.
    pub fn send_command(&mut self, command: PreparedCommand) -> Result<(), FopError> {
        let max = self.config.max_frame_data_length;
        if command.len() > max {
            return Err(FopError::CommandTooLarge {
                len: command.len(),
                max,
            });
        }
        let command = Arc::new(command);
        if self.disabled
            || (command.is_bypass()
                && (self.config.bd_absolute_priority || self.state.bd_goes_direct()))
        {
            debug!(id = %command.id(), "sending command in BD frame");
            let frame = Arc::new(TcTransferFrame::bd(self.config.vc_id, command));
            return self.out_queue.push(frame).map_err(|_| FopError::OutQueueFull);
        }
        if self.state == State::Initial {
            return Err(match self.suspend_state {
                Some(_) => FopError::Suspended,
                None => FopError::ServiceNotActive,
            });
        }
        debug!(id = %command.id(), state = %self.state, "queuing command");
        self.events.push_back(Event::CommandQueued(command.id()));
        self.wait_queue.push_back(command);
        if self.state.is_sending_ad() {
            self.look_for_fdu();
        }
        Ok(())
    }

    /// Set V(S), the sequence number of the next AD frame
    ///
    /// Only valid in the Initial state while not suspended.
    pub fn set_vs(&mut self, v_s: u8) -> Result<(), FopError> {
        self.check_initial()?;
        if self.suspend_state.is_some() {
            return Err(FopError::Suspended);
        }
        trace!(v_s, "setting V(S)");
        self.sent_queue.reset(v_s);
        Ok(())
    }

    /// Initiate the AD service, with or without waiting for a confirming CLCW
    ///
    /// Without CLCW check the machine becomes Active immediately. With CLCW check it waits, for
    /// at most T1, for a CLCW whose N(R) equals V(S).
    pub fn initiate_ad(&mut self, now: Instant, clcw_check: bool) -> Result<(), FopError> {
        self.pre_init_check(false)?;
        info!(vc = self.config.vc_id, clcw_check, "initiating AD service");
        self.initialize();
        if clcw_check {
            let t1 = self.config.t1_initial;
            self.set_timer(now, t1);
            self.set_state(State::InitializingWithoutBcFrame);
        } else {
            self.set_state(State::Active);
        }
        Ok(())
    }

    /// Initiate the AD service by sending a Set V(R) control frame
    pub fn initiate_ad_with_vr(&mut self, v_r: u8) -> Result<(), FopError> {
        self.pre_init_check(true)?;
        info!(vc = self.config.vc_id, v_r, "initiating AD service with set V(R)");
        self.initialize();
        let purged = self.sent_queue.reset(v_r);
        self.purge(FailReason::Purged, purged);
        self.transmit_bc(ControlCommand::SetVr(v_r));
        Ok(())
    }

    /// Initiate the AD service by sending an Unlock control frame
    pub fn initiate_ad_with_unlock(&mut self) -> Result<(), FopError> {
        self.pre_init_check(true)?;
        info!(vc = self.config.vc_id, "initiating AD service with unlock");
        self.initialize();
        self.transmit_bc(ControlCommand::Unlock);
        Ok(())
    }

    /// Terminate the AD service
    ///
    /// Raises the `TERM` alert, failing every outstanding command. Has no effect if the service
    /// is not running.
    pub fn terminate_ad(&mut self) {
        if self.state == State::Initial && self.suspend_state.is_none() {
            return;
        }
        info!(vc = self.config.vc_id, state = %self.state, "terminating AD service");
        self.suspend_state = None;
        self.alert(AlertType::Term);
    }

    /// Resume a suspended AD service
    ///
    /// Re-enters the state the service was suspended in and restarts T1.
    pub fn resume(&mut self, now: Instant) -> Result<(), FopError> {
        let state = self.suspend_state.ok_or(FopError::NotSuspended)?;
        if self.state != State::Initial {
            return Err(FopError::InvalidState { state: self.state });
        }
        info!(vc = self.config.vc_id, %state, "resuming AD service");
        self.suspend_state = None;
        if state == State::InitializingWithoutBcFrame || !self.sent_queue.is_empty() {
            self.start_timer(now);
        }
        self.set_state(state);
        if self.state.is_sending_ad() {
            self.look_for_fdu();
        }
        Ok(())
    }

    /// Stop operating the FOP: every command is sent in BD frames from now on
    ///
    /// Outstanding and waiting commands are failed. Any of the initiate directives enables the
    /// FOP again.
    pub fn disable(&mut self) {
        info!(vc = self.config.vc_id, "disabling COP-1");
        self.stop_timer();
        self.discard_all(FailReason::Purged);
        self.suspend_state = None;
        self.disabled = true;
        self.events.push_back(Event::Disabled);
        self.set_state(State::Initial);
    }

    /// Change T1
    pub fn set_t1_initial(&mut self, value: Duration) -> Result<(), FopError> {
        self.config.t1_initial(value)?;
        Ok(())
    }

    /// Change the transmission limit
    pub fn set_transmission_limit(&mut self, value: u32) -> Result<(), FopError> {
        self.config.transmission_limit(value)?;
        Ok(())
    }

    /// Change the timeout type
    pub fn set_timeout_type(&mut self, value: TimeoutType) {
        self.config.timeout_type(value);
    }

    /// Change the sliding window width
    pub fn set_window_width(&mut self, value: u32) -> Result<(), FopError> {
        self.config.window_width(value)?;
        if self.state.is_sending_ad() {
            self.look_for_fdu();
        }
        Ok(())
    }

    /// Process timer expiration
    pub fn handle_timeout(&mut self, now: Instant) {
        match self.timer {
            Some(deadline) if deadline <= now => {}
            _ => return,
        }
        self.timer = None;
        debug!(
            vc = self.config.vc_id,
            state = %self.state,
            tx_count = self.tx_count,
            tx_limit = self.config.transmission_limit,
            "T1 expired"
        );

        if self.tx_count >= self.config.transmission_limit {
            self.on_t1_exhausted();
            return;
        }
        match self.state {
            State::Active | State::RetransmitWithoutWait => {
                self.initiate_ad_retransmission();
                self.set_state(State::RetransmitWithoutWait);
                self.look_for_fdu();
            }
            State::InitializingWithBcFrame => {
                self.initiate_bc_retransmission();
                self.look_for_directive();
            }
            // Nothing to retransmit while waiting for the initial CLCW
            State::InitializingWithoutBcFrame => self.on_t1_exhausted(),
            State::RetransmitWithWait | State::Initial => {}
        }
    }

    /// Process a CLCW received from the peer
    pub fn handle_clcw(&mut self, now: Instant, clcw: Clcw) {
        if clcw.vc_id != self.config.vc_id {
            trace!(vc = clcw.vc_id, "ignoring CLCW for another virtual channel");
            return;
        }
        trace!(
            state = %self.state,
            ?clcw,
            n_r = clcw.report_value,
            nn_r = self.sent_queue.nn_r(),
            v_s = self.sent_queue.v_s(),
            "received CLCW"
        );
        self.last_clcw = Some(clcw);
        if self.state != State::Initial {
            self.reconcile(now, clcw);
        }
        self.events.push_back(Event::ClcwReceived(clcw));
    }

    fn reconcile(&mut self, now: Instant, clcw: Clcw) {
        use State::*;

        let state = self.state;
        let n_r = clcw.report_value;
        let nn_r = self.sent_queue.nn_r();

        if clcw.lockout {
            // Expected until the unlock control frame is accepted
            if state != InitializingWithBcFrame {
                self.alert(AlertType::Lockout);
            }
            return;
        }

        if n_r == self.sent_queue.v_s() {
            // Everything sent has been received
            match (clcw.retransmit, clcw.wait) {
                (false, false) => match state {
                    InitializingWithoutBcFrame | InitializingWithBcFrame => {
                        self.stop_timer();
                        self.pending_bc = None;
                        self.set_state(Active);
                        self.look_for_fdu();
                    }
                    _ if n_r == nn_r => {
                        if state.is_retransmitting() {
                            self.alert(AlertType::Synch);
                        }
                    }
                    _ => {
                        self.remove_acknowledged(now, n_r);
                        self.set_state(Active);
                        self.look_for_fdu();
                    }
                },
                (false, true) => {
                    if state.is_serving_ad() {
                        self.alert(AlertType::Clcw);
                    }
                }
                (true, _) => {
                    if state != InitializingWithBcFrame {
                        self.alert(AlertType::Synch);
                    }
                }
            }
        } else if self.sent_queue.is_valid_ack(n_r) {
            // Some frames are still outstanding, only reachable while serving AD
            if !clcw.retransmit {
                if clcw.wait {
                    self.alert(AlertType::Clcw);
                } else if n_r == nn_r {
                    if state.is_retransmitting() {
                        self.alert(AlertType::Synch);
                    }
                } else {
                    self.remove_acknowledged(now, n_r);
                    self.set_state(Active);
                    self.look_for_fdu();
                }
            } else if self.config.transmission_limit == 1 {
                self.remove_acknowledged(now, n_r);
                self.alert(AlertType::Limit);
            } else if n_r != nn_r {
                self.remove_acknowledged(now, n_r);
                if clcw.wait {
                    self.set_state(RetransmitWithWait);
                } else {
                    self.initiate_ad_retransmission();
                    self.set_state(RetransmitWithoutWait);
                    self.look_for_fdu();
                }
            } else if self.tx_count >= self.config.transmission_limit {
                self.alert(AlertType::Limit);
            } else if clcw.wait {
                if state != RetransmitWithWait {
                    self.set_state(RetransmitWithWait);
                }
            } else if state != RetransmitWithoutWait {
                self.initiate_ad_retransmission();
                self.set_state(RetransmitWithoutWait);
                self.look_for_fdu();
            }
        } else if state != InitializingWithBcFrame {
            warn!(
                n_r,
                nn_r,
                v_s = self.sent_queue.v_s(),
                "N(R) outside of the sent window"
            );
            self.alert(AlertType::Nnr);
        }
    }

    fn on_t1_exhausted(&mut self) {
        match (self.config.timeout_type, self.state) {
            (_, State::Initial) => {}
            (TimeoutType::Suspend, state) if state != State::InitializingWithBcFrame => {
                info!(vc = self.config.vc_id, %state, "AD service suspended");
                self.stop_timer();
                self.suspend_state = Some(state);
                self.events.push_back(Event::Suspended(state));
                self.set_state(State::Initial);
            }
            _ => self.alert(AlertType::T1),
        }
    }

    fn pre_init_check(&self, with_bc: bool) -> Result<(), FopError> {
        self.check_initial()?;
        if with_bc && self.out_queue.is_full() {
            return Err(FopError::OutQueueFull);
        }
        Ok(())
    }

    fn check_initial(&self) -> Result<(), FopError> {
        match self.state {
            State::Initial => Ok(()),
            state => Err(FopError::InvalidState { state }),
        }
    }

    /// Reset the queues and counters for a new AD service
    fn initialize(&mut self) {
        if self.disabled {
            info!(vc = self.config.vc_id, "enabling COP-1");
            self.disabled = false;
        }
        self.stop_timer();
        self.discard_all(FailReason::Purged);
        self.tx_count = 1;
        self.suspend_state = None;
    }

    fn transmit_bc(&mut self, control: ControlCommand) {
        let frame = Arc::new(TcTransferFrame::bc(self.config.vc_id, control));
        self.pending_bc = Some(PendingBc {
            frame: frame.clone(),
            to_be_retransmitted: false,
        });
        self.tx_count = 1;
        self.set_state(State::InitializingWithBcFrame);
        self.queue_bc(frame);
    }

    /// Emit the next AD frame if the out queue has room for one
    fn look_for_fdu(&mut self) {
        if !self.ad_out_ready {
            return;
        }
        if let Some(frame) = self.sent_queue.next_retransmission() {
            debug!(seq = frame.seq(), tx_count = self.tx_count, "retransmitting frame");
            self.queue_ad(frame);
            return;
        }
        if self.sent_queue.len() >= usize::from(self.config.window_width) {
            return;
        }
        let Some(frame) = self.next_queued_frame() else {
            return;
        };
        if self.sent_queue.is_empty() {
            self.tx_count = 1;
        }
        trace!(seq = frame.seq(), commands = frame.commands().len(), "new AD frame");
        self.sent_queue.push(frame.clone());
        self.queue_ad(frame);
    }

    /// Build an AD frame from the wait queue, releasing bypass commands met on the way
    fn next_queued_frame(&mut self) -> Option<Arc<TcTransferFrame>> {
        let max = self.config.max_frame_data_length;
        let mut length = 0;
        let mut commands = Vec::new();
        while let Some(command) = self.wait_queue.pop_front() {
            if command.is_bypass() {
                let id = command.id();
                let frame = Arc::new(TcTransferFrame::bd(self.config.vc_id, command));
                if self.out_queue.push(frame).is_err() {
                    warn!(%id, "out queue full, dropping bypass command");
                    self.events.push_back(Event::CommandFailed {
                        id,
                        reason: FailReason::OutQueueFull,
                    });
                }
                continue;
            }
            if length + command.len() > max {
                self.wait_queue.push_front(command);
                break;
            }
            length += command.len();
            commands.push(command);
            if !self.config.multiple_commands_per_frame {
                break;
            }
        }
        if commands.is_empty() {
            return None;
        }
        let seq = self.sent_queue.v_s();
        Some(Arc::new(TcTransferFrame::ad(self.config.vc_id, seq, commands)))
    }

    fn look_for_directive(&mut self) {
        if !self.bc_out_ready {
            return;
        }
        let Some(pending) = &mut self.pending_bc else {
            return;
        };
        if pending.to_be_retransmitted {
            pending.to_be_retransmitted = false;
            let frame = pending.frame.clone();
            debug!(tx_count = self.tx_count, "retransmitting control frame");
            self.queue_bc(frame);
        }
    }

    fn queue_ad(&mut self, frame: Arc<TcTransferFrame>) {
        match self.out_queue.push(frame) {
            Ok(()) => self.ad_out_ready = false,
            Err(_) => {
                warn!("out queue full, cannot queue AD frame");
                self.alert(AlertType::Llif);
            }
        }
    }

    fn queue_bc(&mut self, frame: Arc<TcTransferFrame>) {
        match self.out_queue.push(frame) {
            Ok(()) => self.bc_out_ready = false,
            Err(_) => {
                warn!("out queue full, cannot queue control frame");
                self.alert(AlertType::Llif);
            }
        }
    }

    fn initiate_ad_retransmission(&mut self) {
        self.tx_count += 1;
        // A frame still in the out queue will be queued again in window order
        if self.out_queue.remove_type(FrameType::Ad) {
            self.ad_out_ready = true;
        }
        self.sent_queue.mark_for_retransmission();
    }

    fn initiate_bc_retransmission(&mut self) {
        self.tx_count += 1;
        if let Some(pending) = &mut self.pending_bc {
            pending.to_be_retransmitted = true;
        }
    }

    fn remove_acknowledged(&mut self, now: Instant, n_r: u8) {
        for frame in self.sent_queue.acknowledge(n_r) {
            trace!(seq = frame.seq(), "frame acknowledged");
            for command in frame.commands() {
                self.events
                    .push_back(Event::CommandAcknowledged(command.id()));
            }
        }
        self.tx_count = 1;
        if self.sent_queue.is_empty() {
            self.stop_timer();
        } else {
            self.start_timer(now);
        }
    }

    fn alert(&mut self, alert: AlertType) {
        warn!(vc = self.config.vc_id, state = %self.state, %alert, "alert");
        self.stop_timer();
        self.discard_all(FailReason::Alert(alert));
        self.events.push_back(Event::Alert(alert));
        self.set_state(State::Initial);
    }

    /// Drop the sent and wait queues and any AD or BC frame waiting for the channel
    fn discard_all(&mut self, reason: FailReason) {
        let purged = self.sent_queue.drain();
        self.purge(reason, purged);
        for command in self.wait_queue.drain(..) {
            self.events.push_back(Event::CommandFailed {
                id: command.id(),
                reason,
            });
        }
        self.pending_bc = None;
        self.out_queue.remove_type(FrameType::Ad);
        self.out_queue.remove_type(FrameType::Bc);
        self.ad_out_ready = true;
        self.bc_out_ready = true;
    }

    fn purge(&mut self, reason: FailReason, frames: Vec<Arc<TcTransferFrame>>) {
        for frame in frames {
            for command in frame.commands() {
                self.events.push_back(Event::CommandFailed {
                    id: command.id(),
                    reason,
                });
            }
        }
    }

    fn set_state(&mut self, new: State) {
        let old = self.state;
        if old != new {
            debug!(vc = self.config.vc_id, %old, %new, "state change");
            self.state = new;
            self.events.push_back(Event::StateChanged { old, new });
        }
    }

    fn start_timer(&mut self, now: Instant) {
        let t1 = self.config.t1_initial;
        self.set_timer(now, t1);
    }

    fn set_timer(&mut self, now: Instant, duration: Duration) {
        trace!(?duration, "starting T1");
        self.timer = Some(now + duration);
    }

    fn stop_timer(&mut self) {
        if self.timer.take().is_some() {
            trace!("stopping T1");
        }
    }
}

impl fmt::Debug for Fop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fop")
            .field("vc_id", &self.config.vc_id)
            .field("state", &self.state)
            .field("suspend_state", &self.suspend_state)
            .field("v_s", &self.sent_queue.v_s())
            .field("nn_r", &self.sent_queue.nn_r())
            .field("tx_count", &self.tx_count)
            .finish_non_exhaustive()
    }
}

/// FOP-1 states, as numbered in CCSDS 232.1-B-2
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum State {
    /// S1: normal AD service
    Active,
    /// S2: the sent queue is being retransmitted
    RetransmitWithoutWait,
    /// S3: retransmission requested, but the FARM asked to wait
    RetransmitWithWait,
    /// S4: waiting for a CLCW confirming V(S)
    InitializingWithoutBcFrame,
    /// S5: a BC frame (Unlock or Set V(R)) is being sent to initialize the FARM
    InitializingWithBcFrame,
    /// S6: no AD service
    Initial,
}

impl State {
    /// State number as used in CCSDS 232.1-B-2
    pub fn number(self) -> u8 {
        match self {
            Self::Active => 1,
            Self::RetransmitWithoutWait => 2,
            Self::RetransmitWithWait => 3,
            Self::InitializingWithoutBcFrame => 4,
            Self::InitializingWithBcFrame => 5,
            Self::Initial => 6,
        }
    }

    /// States in which new AD frames may be emitted
    fn is_sending_ad(self) -> bool {
        matches!(self, Self::Active | Self::RetransmitWithoutWait)
    }

    /// States S1 to S3
    fn is_serving_ad(self) -> bool {
        matches!(
            self,
            Self::Active | Self::RetransmitWithoutWait | Self::RetransmitWithWait
        )
    }

    fn is_retransmitting(self) -> bool {
        matches!(self, Self::RetransmitWithoutWait | Self::RetransmitWithWait)
    }

    /// States in which bypass commands skip the wait queue
    fn bd_goes_direct(self) -> bool {
        !self.is_sending_ad()
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Active => "Active",
            Self::RetransmitWithoutWait => "Retransmit without wait",
            Self::RetransmitWithWait => "Retransmit with wait",
            Self::InitializingWithoutBcFrame => "Initialising without BC frame",
            Self::InitializingWithBcFrame => "Initialising with BC frame",
            Self::Initial => "Initial",
        })
    }
}

/// Conditions that abort the AD service
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum AlertType {
    /// T1 expired with the transmission limit reached
    T1,
    /// The FARM reported lockout
    Lockout,
    /// The FARM asked to wait without asking for retransmission
    Clcw,
    /// Retransmission was requested with the transmission limit reached
    Limit,
    /// The CLCW is inconsistent with what has been sent
    Synch,
    /// N(R) lies outside of the sent window
    Nnr,
    /// The AD service was terminated by directive
    Term,
    /// The lower layer refused a frame
    Llif,
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::T1 => "T1",
            Self::Lockout => "LOCKOUT",
            Self::Clcw => "CLCW",
            Self::Limit => "LIMIT",
            Self::Synch => "SYNCH",
            Self::Nnr => "NNR",
            Self::Term => "TERM",
            Self::Llif => "LLIF",
        })
    }
}

/// Notifications for monitors, drained with [`Fop::poll`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The protocol state changed
    StateChanged {
        /// State before the transition
        old: State,
        /// State after the transition
        new: State,
    },
    /// The AD service was aborted; the machine is now in the Initial state
    Alert(AlertType),
    /// T1 ran out with the Suspend timeout type; carries the state the service was in
    Suspended(State),
    /// COP-1 was disabled
    Disabled,
    /// A CLCW for this virtual channel was processed
    ClcwReceived(Clcw),
    /// A command was put on the wait queue
    CommandQueued(CommandId),
    /// The transmission channel took a frame
    FrameReleased {
        /// Service type of the frame
        frame_type: FrameType,
        /// N(S), zero for BD and BC frames
        seq: u8,
    },
    /// The peer acknowledged the frame carrying the command
    CommandAcknowledged(CommandId),
    /// The command will not be delivered
    CommandFailed {
        /// Identifier of the command
        id: CommandId,
        /// Why the command was dropped
        reason: FailReason,
    },
}

/// Why a command was dropped
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum FailReason {
    /// The AD service was aborted
    Alert(AlertType),
    /// The queues were purged by a directive
    Purged,
    /// There was no room left for a BD frame
    OutQueueFull,
}

/// Snapshot of a [`Fop`], see [`Fop::status`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    /// Current state
    pub state: State,
    /// State the AD service was suspended in, if suspended
    pub suspend_state: Option<State>,
    /// False after [`Fop::disable`]
    pub cop1_active: bool,
    /// V(S)
    pub v_s: u8,
    /// NN(R)
    pub nn_r: u8,
    /// Transmission_Count
    pub tx_count: u32,
    /// Commands waiting for a frame
    pub wait_queue_len: usize,
    /// Unacknowledged AD frames
    pub sent_queue_len: usize,
    /// Frames waiting for the transmission channel
    pub out_queue_len: usize,
    /// Last CLCW received for this virtual channel
    pub last_clcw: Option<Clcw>,
}

/// Reasons why a directive or command was rejected
///
/// A rejected request leaves the machine unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FopError {
    /// The directive is not allowed in the current state
    #[error("invalid state {state} for this operation")]
    InvalidState {
        /// The state the machine is in
        state: State,
    },
    /// The directive is not allowed while suspended
    #[error("AD service is suspended")]
    Suspended,
    /// `resume` was requested while not suspended
    #[error("AD service is not suspended")]
    NotSuspended,
    /// An AD command was submitted while the AD service is not initiated
    #[error("AD service is not initiated")]
    ServiceNotActive,
    /// The command does not fit in a frame
    #[error("command of {len} bytes does not fit in a frame data field of {max} bytes")]
    CommandTooLarge {
        /// Length of the command
        len: usize,
        /// Maximum frame data length
        max: usize,
    },
    /// No room in the out queue for a BD frame
    #[error("outbound frame queue full")]
    OutQueueFull,
    /// A parameter is out of range
    #[error("invalid parameter: {0}")]
    Config(#[from] ConfigError),
}
