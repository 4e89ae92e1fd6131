use std::{sync::Arc, time::Instant};

use proto::{
    Clcw, Duration, Event, Fop, FopConfig, FopError, PreparedCommand, Status, TcTransferFrame,
    TimeoutType,
};
use thiserror::Error;
use tokio::{
    sync::{mpsc, oneshot, Notify},
    time::{sleep_until, timeout_at, Instant as TokioInstant},
};
use tracing::{debug, info_span, trace, Instrument};

use crate::Monitor;

/// A FOP-1 engine for one TC virtual channel
///
/// The protocol machine runs on a dedicated task spawned by [`Engine::new`]; every method of this
/// handle submits a request to that task and requests are processed strictly in submission order.
/// CLCWs, T1 expirations and directives are therefore serialized with respect to each other.
/// Monitors have seen the events caused by a request by the time the request resolves.
///
/// May be cloned to obtain another handle to the same engine. The task stops once every handle is
/// dropped.
#[derive(Debug, Clone)]
pub struct Engine {
    requests: mpsc::UnboundedSender<Request>,
    shared: Arc<Shared>,
}

impl Engine {
    /// Spawn the engine task for a new FOP in the Initial state
    ///
    /// Must be called from within a tokio runtime. If [`FopConfig::initial_clcw_wait`] is set the
    /// AD service is initiated with CLCW check right away.
    pub fn new(config: FopConfig) -> Self {
        let (send, recv) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            data_available: Notify::new(),
        });
        let span = info_span!("fop", vc = config.get_vc_id());
        let driver = EngineDriver {
            fop: Fop::new(config),
            requests: recv,
            monitors: Vec::new(),
            shared: shared.clone(),
        };
        tokio::spawn(driver.run().instrument(span));
        Self {
            requests: send,
            shared,
        }
    }

    /// Submit a command
    ///
    /// Resolves once the command has been queued, not once it is acknowledged: the outcome of an
    /// AD command is reported to monitors as [`Event::CommandAcknowledged`] or
    /// [`Event::CommandFailed`].
    pub async fn send_command(&self, command: PreparedCommand) -> Result<(), EngineError> {
        self.request(|tx| Request::SendCommand(command, tx)).await??;
        Ok(())
    }

    /// Hand a CLCW received on the downlink to the engine
    ///
    /// Does not wait for the CLCW to be processed. CLCWs arriving after the engine stopped are
    /// dropped.
    pub fn on_clcw(&self, clcw: impl Into<Clcw>) {
        let clcw = clcw.into();
        if self.requests.send(Request::Clcw(clcw)).is_err() {
            trace!(?clcw, "engine stopped, dropping CLCW");
        }
    }

    /// Take the next frame for the transmission channel, if any
    ///
    /// Taking the frame counts as transmitting it, so it should be sent without delay.
    pub async fn get_frame(&self) -> Result<Option<Arc<TcTransferFrame>>, EngineError> {
        self.request(Request::GetFrame).await
    }

    /// Wait for up to `timeout` for the next frame
    pub async fn next_frame(
        &self,
        timeout: Duration,
    ) -> Result<Option<Arc<TcTransferFrame>>, EngineError> {
        let deadline = TokioInstant::now() + timeout;
        loop {
            if let Some(frame) = self.get_frame().await? {
                return Ok(Some(frame));
            }
            if timeout_at(deadline, self.shared.data_available.notified())
                .await
                .is_err()
            {
                return Ok(None);
            }
        }
    }

    /// Register a monitor
    ///
    /// Monitors see every event emitted after their registration, in registration order.
    pub async fn add_monitor(&self, monitor: impl Monitor + 'static) -> Result<(), EngineError> {
        let monitor = Box::new(monitor);
        self.request(|tx| Request::AddMonitor(monitor, tx)).await
    }

    /// Initiate the AD service, with or without waiting for a confirming CLCW
    pub async fn initiate_ad(&self, clcw_check: bool) -> Result<(), EngineError> {
        self.directive(Directive::InitiateAd { clcw_check }).await
    }

    /// Initiate the AD service by sending a Set V(R) control frame
    pub async fn initiate_ad_with_vr(&self, v_r: u8) -> Result<(), EngineError> {
        self.directive(Directive::InitiateAdWithVr(v_r)).await
    }

    /// Initiate the AD service by sending an Unlock control frame
    pub async fn initiate_ad_with_unlock(&self) -> Result<(), EngineError> {
        self.directive(Directive::InitiateAdWithUnlock).await
    }

    /// Terminate the AD service
    pub async fn terminate_ad(&self) -> Result<(), EngineError> {
        self.directive(Directive::TerminateAd).await
    }

    /// Resume a suspended AD service
    pub async fn resume(&self) -> Result<(), EngineError> {
        self.directive(Directive::Resume).await
    }

    /// Set V(S), only allowed in the Initial state
    pub async fn set_vs(&self, v_s: u8) -> Result<(), EngineError> {
        self.directive(Directive::SetVs(v_s)).await
    }

    /// Change the sliding window width
    pub async fn set_window_width(&self, value: u32) -> Result<(), EngineError> {
        self.directive(Directive::SetWindowWidth(value)).await
    }

    /// Change the transmission limit
    pub async fn set_transmission_limit(&self, value: u32) -> Result<(), EngineError> {
        self.directive(Directive::SetTransmissionLimit(value)).await
    }

    /// Change the timeout type
    pub async fn set_timeout_type(&self, value: TimeoutType) -> Result<(), EngineError> {
        self.directive(Directive::SetTimeoutType(value)).await
    }

    /// Change T1
    pub async fn set_t1_initial(&self, value: Duration) -> Result<(), EngineError> {
        self.directive(Directive::SetT1Initial(value)).await
    }

    /// Send every command in BD frames until the AD service is initiated again
    pub async fn disable(&self) -> Result<(), EngineError> {
        self.directive(Directive::Disable).await
    }

    /// Current state of the FOP
    pub async fn status(&self) -> Result<Status, EngineError> {
        self.request(Request::Status).await
    }

    /// Current configuration, including changes made through directives
    pub async fn config(&self) -> Result<FopConfig, EngineError> {
        self.request(Request::Config).await
    }

    /// Wait until every request submitted before has been processed
    pub async fn sync(&self) -> Result<(), EngineError> {
        self.request(Request::Sync).await
    }

    async fn directive(&self, directive: Directive) -> Result<(), EngineError> {
        self.request(|tx| Request::Directive(directive, tx)).await??;
        Ok(())
    }

    async fn request<T>(
        &self,
        f: impl FnOnce(oneshot::Sender<T>) -> Request,
    ) -> Result<T, EngineError> {
        let (send, recv) = oneshot::channel();
        self.requests
            .send(f(send))
            .map_err(|_| EngineError::Stopped)?;
        recv.await.map_err(|_| EngineError::Stopped)
    }
}

/// Errors returned by [`Engine`] operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The FOP rejected the request
    #[error(transparent)]
    Fop(#[from] FopError),
    /// The engine task is gone
    #[error("engine stopped")]
    Stopped,
}

#[derive(Debug)]
struct Shared {
    /// Signalled whenever frames are waiting for the transmission channel
    data_available: Notify,
}

enum Request {
    SendCommand(PreparedCommand, oneshot::Sender<Result<(), FopError>>),
    Clcw(Clcw),
    GetFrame(oneshot::Sender<Option<Arc<TcTransferFrame>>>),
    AddMonitor(Box<dyn Monitor>, oneshot::Sender<()>),
    Directive(Directive, oneshot::Sender<Result<(), FopError>>),
    Status(oneshot::Sender<Status>),
    Config(oneshot::Sender<FopConfig>),
    Sync(oneshot::Sender<()>),
}

#[derive(Debug)]
enum Directive {
    InitiateAd { clcw_check: bool },
    InitiateAdWithVr(u8),
    InitiateAdWithUnlock,
    TerminateAd,
    Resume,
    SetVs(u8),
    SetWindowWidth(u32),
    SetTransmissionLimit(u32),
    SetTimeoutType(TimeoutType),
    SetT1Initial(Duration),
    Disable,
}

struct EngineDriver {
    fop: Fop,
    requests: mpsc::UnboundedReceiver<Request>,
    monitors: Vec<Box<dyn Monitor>>,
    shared: Arc<Shared>,
}

impl EngineDriver {
    async fn run(mut self) {
        debug!("engine started");
        self.fop.start(now());
        loop {
            self.forward_events();
            let deadline = self.fop.poll_timeout().map(TokioInstant::from_std);
            tokio::select! {
                request = self.requests.recv() => match request {
                    Some(request) => self.handle(request),
                    None => break,
                },
                () = sleep_until(deadline.unwrap_or_else(TokioInstant::now)),
                    if deadline.is_some() =>
                {
                    self.fop.handle_timeout(now());
                }
            }
        }
        debug!("engine stopped");
    }

    fn handle(&mut self, request: Request) {
        match request {
            Request::SendCommand(command, tx) => {
                let result = self.fop.send_command(command);
                self.forward_events();
                let _ = tx.send(result);
            }
            Request::Clcw(clcw) => self.fop.handle_clcw(now(), clcw),
            Request::GetFrame(tx) => {
                let frame = self.fop.poll_transmit(now());
                self.forward_events();
                let _ = tx.send(frame);
            }
            Request::AddMonitor(monitor, tx) => {
                self.monitors.push(monitor);
                let _ = tx.send(());
            }
            Request::Directive(directive, tx) => {
                trace!(?directive, "directive");
                let result = self.apply(directive);
                self.forward_events();
                let _ = tx.send(result);
            }
            Request::Status(tx) => {
                let _ = tx.send(self.fop.status());
            }
            Request::Config(tx) => {
                let _ = tx.send(self.fop.config().clone());
            }
            Request::Sync(tx) => {
                let _ = tx.send(());
            }
        }
    }

    fn apply(&mut self, directive: Directive) -> Result<(), FopError> {
        let fop = &mut self.fop;
        match directive {
            Directive::InitiateAd { clcw_check } => fop.initiate_ad(now(), clcw_check),
            Directive::InitiateAdWithVr(v_r) => fop.initiate_ad_with_vr(v_r),
            Directive::InitiateAdWithUnlock => fop.initiate_ad_with_unlock(),
            Directive::TerminateAd => {
                fop.terminate_ad();
                Ok(())
            }
            Directive::Resume => fop.resume(now()),
            Directive::SetVs(v_s) => fop.set_vs(v_s),
            Directive::SetWindowWidth(value) => fop.set_window_width(value),
            Directive::SetTransmissionLimit(value) => fop.set_transmission_limit(value),
            Directive::SetTimeoutType(value) => {
                fop.set_timeout_type(value);
                Ok(())
            }
            Directive::SetT1Initial(value) => fop.set_t1_initial(value),
            Directive::Disable => {
                fop.disable();
                Ok(())
            }
        }
    }

    fn forward_events(&mut self) {
        while let Some(event) = self.fop.poll() {
            if let Event::Alert(alert) = &event {
                debug!(%alert, "notifying monitors of alert");
            }
            for monitor in &mut self.monitors {
                monitor.on_event(&event);
            }
        }
        if self.fop.status().out_queue_len > 0 {
            self.shared.data_available.notify_one();
        }
    }
}

/// The engine clock, following tokio's so that paused time applies to T1
fn now() -> Instant {
    TokioInstant::now().into_std()
}
