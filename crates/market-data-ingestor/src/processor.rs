use crate::{
    data_source::{FeedConnector, FrameStream},
    steps::{decode_frame, DetectorPushStep, FilterStep},
    types::ConnectionState,
};
use anyhow::Result;
use common::messages::FeedEvent;
use config_lib::FeedConfig;
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::{mpsc::UnboundedSender, oneshot, watch};
use tracing::{debug, info, warn};

/// How a session with an established channel ended.
enum SessionEnd {
    Closed,
    Shutdown,
}

/// Owns the feed channel: connects, forwards decoded frames to the engine,
/// and reconnects after a fixed delay whenever the channel fails or closes.
pub struct FeedConnectionManager {
    connector: Box<dyn FeedConnector>,
    filter: FilterStep,
    push: DetectorPushStep,
    reconnect_delay: Duration,
    state_tx: watch::Sender<ConnectionState>,
}

impl FeedConnectionManager {
    pub fn new(
        connector: Box<dyn FeedConnector>,
        config: &FeedConfig,
        sender: UnboundedSender<FeedEvent>,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            connector,
            filter: FilterStep::new(&config.filter),
            push: DetectorPushStep::new(sender),
            reconnect_delay: config.reconnect_delay(),
            state_tx,
        }
    }

    /// Observe connection state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    fn set_state(&self, state: ConnectionState) {
        debug!(%state, "Feed state");
        self.state_tx.send_replace(state);
    }

    /// Runs until `shutdown` fires (or its sender is dropped). Retries forever
    /// otherwise. Fails only if the engine side of the channel is gone.
    pub async fn run(self, mut shutdown: oneshot::Receiver<()>) -> Result<()> {
        info!(
            reconnect_delay_ms = self.reconnect_delay.as_millis() as u64,
            "Starting feed connection manager"
        );

        loop {
            self.set_state(ConnectionState::Connecting);
            let connected = tokio::select! {
                _ = &mut shutdown => break,
                result = self.connector.connect() => result,
            };

            match connected {
                Ok(frames) => {
                    self.set_state(ConnectionState::Connected);
                    self.push.push_connectivity(true)?;
                    info!("Feed connected");

                    match self.stream_frames(frames, &mut shutdown).await? {
                        SessionEnd::Shutdown => break,
                        SessionEnd::Closed => self.push.push_connectivity(false)?,
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Feed connection failed");
                }
            }

            self.set_state(ConnectionState::Closed { will_retry: true });
            info!(
                delay_ms = self.reconnect_delay.as_millis() as u64,
                "Reconnecting after delay"
            );
            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }

        self.set_state(ConnectionState::Closed { will_retry: false });
        info!("Feed connection manager stopped");
        Ok(())
    }

    async fn stream_frames(
        &self,
        mut frames: FrameStream,
        shutdown: &mut oneshot::Receiver<()>,
    ) -> Result<SessionEnd> {
        loop {
            tokio::select! {
                _ = &mut *shutdown => return Ok(SessionEnd::Shutdown),
                next = frames.next() => match next {
                    Some(Ok(payload)) => self.handle_frame(&payload)?,
                    Some(Err(e)) => {
                        warn!(error = %e, "Feed channel error");
                        return Ok(SessionEnd::Closed);
                    }
                    None => {
                        warn!("Feed channel closed");
                        return Ok(SessionEnd::Closed);
                    }
                },
            }
        }
    }

    fn handle_frame(&self, payload: &[u8]) -> Result<()> {
        let text = match std::str::from_utf8(payload) {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, len = payload.len(), "Discarding frame that is not UTF-8");
                return Ok(());
            }
        };
        match decode_frame(text) {
            Ok(Some(message)) => {
                if let Some(message) = self.filter.apply(message) {
                    self.push.push_message(message)?;
                }
            }
            Ok(None) => debug!("Ignoring frame of unknown type"),
            Err(e) => warn!(error = %e, "Discarding malformed frame"),
        }
        Ok(())
    }
}
