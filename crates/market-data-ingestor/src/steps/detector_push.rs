use anyhow::Result;
use common::messages::{FeedEvent, FeedMessage};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error};

/// Step that pushes decoded messages to the engine via a channel.
/// The channel is unbounded so delivery never waits on the engine.
#[derive(Clone)]
pub struct DetectorPushStep {
    sender: UnboundedSender<FeedEvent>,
}

impl DetectorPushStep {
    pub fn new(sender: UnboundedSender<FeedEvent>) -> Self {
        Self { sender }
    }

    pub fn push_message(&self, message: FeedMessage) -> Result<()> {
        debug!(kind = message.kind(), "Pushing message to engine");
        self.send(FeedEvent::Message(message))
    }

    pub fn push_connectivity(&self, connected: bool) -> Result<()> {
        self.send(FeedEvent::Connectivity(connected))
    }

    fn send(&self, event: FeedEvent) -> Result<()> {
        if let Err(e) = self.sender.send(event) {
            error!(error = %e, "Failed to send event to engine");
            return Err(anyhow::anyhow!("Channel send failed: {}", e));
        }
        Ok(())
    }
}
