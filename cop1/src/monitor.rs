use tokio::sync::mpsc;

use proto::Event;

/// Observer of an [`Engine`](crate::Engine)
///
/// Called on the engine task, so implementations must not block.
pub trait Monitor: Send {
    /// Called for every event emitted by the FOP
    fn on_event(&mut self, event: &Event);
}

impl Monitor for mpsc::UnboundedSender<Event> {
    fn on_event(&mut self, event: &Event) {
        // The receiver going away just means nobody is listening anymore
        let _ = self.send(event.clone());
    }
}
