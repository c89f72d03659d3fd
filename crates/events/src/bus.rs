use crate::messages::RoundSummary;
use tokio::sync::broadcast;

/// The internal observability channel round summaries are published on
/// (SPEC_FULL §4A). Stands in for `WsMessage`'s real-time dashboard fan-out
/// in the teacher repo — the dashboard itself is out of scope, but a
/// `tokio::sync::broadcast` channel is the same primitive, repurposed for
/// any in-process subscriber (tests, a future CLI, structured logging).
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<RoundSummary>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RoundSummary> {
        self.sender.subscribe()
    }

    /// Publishes a round summary. Returns the number of active subscribers
    /// that received it; an error here means nobody is listening, which is
    /// not a failure the scheduler should propagate.
    pub fn publish(&self, summary: RoundSummary) {
        let _ = self.sender.send(summary);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
