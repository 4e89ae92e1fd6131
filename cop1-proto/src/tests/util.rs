use std::{
    io::{self, Write},
    str,
    sync::Arc,
};

use tracing::{info_span, trace};
use tracing_subscriber::EnvFilter;

use crate::{
    AlertType, Clcw, CommandId, ControlCommand, Duration, Event, Fop, FopConfig, FopError,
    FrameType, Instant, PreparedCommand, State, TcTransferFrame,
};

/// A FOP together with a simulated clock and the receiving end of the virtual channel
pub(super) struct Pair {
    pub(super) fop: Fop,
    pub(super) farm: Farm,
    pub(super) time: Instant,
    /// Every event emitted so far, in order
    pub(super) events: Vec<Event>,
    next_id: u64,
}

impl Pair {
    pub(super) fn new(config: FopConfig) -> Self {
        let farm = Farm::new(config.get_vc_id(), 20);
        Self {
            fop: Fop::new(config),
            farm,
            time: Instant::now(),
            events: Vec::new(),
            next_id: 0,
        }
    }

    /// FOP on VC 0 with a short T1, otherwise configured through `f`
    pub(super) fn with_config(f: impl FnOnce(&mut FopConfig)) -> Self {
        let mut config = FopConfig::default();
        config.t1_initial(Duration::from_millis(100)).unwrap();
        f(&mut config);
        Self::new(config)
    }

    pub(super) fn state(&self) -> State {
        self.fop.state()
    }

    /// Run a directive at the current simulated time
    pub(super) fn directive<T>(&mut self, f: impl FnOnce(&mut Fop, Instant) -> T) -> T {
        let result = f(&mut self.fop, self.time);
        self.drain_events();
        result
    }

    /// Collect the events emitted since the last call into the FOP
    pub(super) fn drain_events(&mut self) {
        while let Some(event) = self.fop.poll() {
            trace!(?event, "event");
            self.events.push(event);
        }
    }

    pub(super) fn alerts(&self) -> Vec<AlertType> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Alert(alert) => Some(*alert),
                _ => None,
            })
            .collect()
    }

    pub(super) fn suspensions(&self) -> Vec<State> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Suspended(state) => Some(*state),
                _ => None,
            })
            .collect()
    }

    pub(super) fn acknowledged(&self) -> Vec<CommandId> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::CommandAcknowledged(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    /// Submit a command of `len` bytes under a fresh identifier
    pub(super) fn send(&mut self, bypass: bool, len: usize) -> Result<CommandId, FopError> {
        self.next_id += 1;
        let id = CommandId(self.next_id);
        let payload = vec![0u8; len];
        let command = match bypass {
            true => PreparedCommand::bypass(id, payload),
            false => PreparedCommand::new(id, payload),
        };
        let result = self.fop.send_command(command);
        self.drain_events();
        result.map(|()| id)
    }

    /// Send one AD command and take the frame carrying it
    pub(super) fn send_in_one_frame(&mut self) -> Arc<TcTransferFrame> {
        let id = self.send(false, 100).unwrap();
        let frame = self.get_frame().expect("no frame for command");
        assert_eq!(frame.frame_type(), FrameType::Ad);
        assert_eq!(frame.commands()[0].id(), id);
        frame
    }

    pub(super) fn get_frame(&mut self) -> Option<Arc<TcTransferFrame>> {
        let frame = self.fop.poll_transmit(self.time);
        self.drain_events();
        frame
    }

    /// Take up to `n` frames, letting simulated time run for at most `max`
    pub(super) fn get_frames(&mut self, n: usize, max: Duration) -> Vec<Arc<TcTransferFrame>> {
        let end = self.time + max;
        let mut frames = Vec::new();
        while frames.len() < n {
            if let Some(frame) = self.get_frame() {
                frames.push(frame);
                continue;
            }
            match self.fop.poll_timeout() {
                Some(t) if t <= end => self.advance_to(t),
                _ => {
                    self.time = end;
                    break;
                }
            }
        }
        frames
    }

    /// Let simulated time run until T1 stops firing or `max` has passed
    pub(super) fn run_timers(&mut self, max: Duration) {
        let end = self.time + max;
        while let Some(t) = self.fop.poll_timeout() {
            if t > end {
                break;
            }
            self.advance_to(t);
        }
        self.time = end;
    }

    pub(super) fn advance_to(&mut self, t: Instant) {
        self.time = t;
        self.fop.handle_timeout(t);
        self.drain_events();
    }

    /// Feed a CLCW for VC 0 with the given flags
    pub(super) fn clcw(&mut self, lockout: bool, wait: bool, retransmit: bool, n_r: u8) {
        let word = (1 << 24)
            | u32::from(lockout) << 13
            | u32::from(wait) << 12
            | u32::from(retransmit) << 11
            | u32::from(n_r);
        self.handle_clcw(Clcw::from_word(word));
    }

    pub(super) fn handle_clcw(&mut self, clcw: Clcw) {
        self.fop.handle_clcw(self.time, clcw);
        self.drain_events();
    }

    /// Take the next frame and hand it to the FARM unless `lose` is set
    pub(super) fn transmit(&mut self, lose: bool) -> bool {
        let Some(frame) = self.get_frame() else {
            return false;
        };
        if lose {
            trace!(?frame, "frame lost");
        } else {
            self.farm.receive(&frame);
        }
        true
    }

    /// Deliver the current CLCW of the FARM
    pub(super) fn report(&mut self) {
        let clcw = self.farm.clcw();
        self.handle_clcw(clcw);
    }
}

/// Minimal FARM-1 receiver
#[derive(Debug)]
pub(super) struct Farm {
    vc_id: u8,
    pub(super) v_r: u8,
    pub(super) lockout: bool,
    pub(super) wait: bool,
    pub(super) retransmit: bool,
    /// Half of FARM_Sliding_Window_Width
    half_window: u8,
    /// Commands accepted in AD frames, in order
    pub(super) delivered: Vec<CommandId>,
}

impl Farm {
    pub(super) fn new(vc_id: u8, window_width: u8) -> Self {
        Self {
            vc_id,
            v_r: 0,
            lockout: false,
            wait: false,
            retransmit: false,
            half_window: window_width / 2,
            delivered: Vec::new(),
        }
    }

    pub(super) fn receive(&mut self, frame: &TcTransferFrame) {
        let _span = info_span!("farm", v_r = self.v_r).entered();
        match frame.frame_type() {
            FrameType::Bd => {}
            FrameType::Bc => match frame.control() {
                Some(ControlCommand::Unlock) => {
                    self.lockout = false;
                    self.wait = false;
                    self.retransmit = false;
                }
                Some(ControlCommand::SetVr(v_r)) if !self.lockout => {
                    self.v_r = v_r;
                    self.wait = false;
                    self.retransmit = false;
                }
                _ => {}
            },
            FrameType::Ad if self.lockout => {}
            FrameType::Ad => {
                let ahead = frame.seq().wrapping_sub(self.v_r);
                let behind = self.v_r.wrapping_sub(frame.seq());
                if ahead == 0 {
                    trace!(seq = frame.seq(), "accepted");
                    self.delivered.extend(frame.commands().iter().map(|c| c.id()));
                    self.v_r = self.v_r.wrapping_add(1);
                    self.retransmit = false;
                } else if ahead < self.half_window {
                    trace!(seq = frame.seq(), "gap, asking for retransmission");
                    self.retransmit = true;
                } else if behind <= self.half_window {
                    trace!(seq = frame.seq(), "duplicate");
                } else {
                    trace!(seq = frame.seq(), "lockout");
                    self.lockout = true;
                }
            }
        }
    }

    pub(super) fn clcw(&self) -> Clcw {
        Clcw::new(self.vc_id, self.v_r)
            .with_lockout(self.lockout)
            .with_wait(self.wait)
            .with_retransmit(self.retransmit)
    }
}

pub(super) fn subscribe() -> tracing::subscriber::DefaultGuard {
    let sub = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(|| TestWriter)
        .finish();
    tracing::subscriber::set_default(sub)
}

struct TestWriter;

impl Write for TestWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        print!(
            "{}",
            str::from_utf8(buf).expect("tried to log invalid UTF-8")
        );
        Ok(buf.len())
    }
    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()
    }
}
