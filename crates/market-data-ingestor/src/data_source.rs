use anyhow::{Context, Result};
use async_trait::async_trait;
use config_lib::DataSource;
use futures::stream::{Stream, StreamExt};
use std::{pin::Pin, time::Duration};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::SplitStream;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info};

/// Raw frame payloads of one established channel. The stream ending, or
/// yielding an error, means the channel is closed. Payloads are not checked
/// for UTF-8 here; an undecodable payload is a malformed frame, not a
/// channel failure.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>>> + Send>>;

/// Abstracts the transport the feed arrives over, allowing for live or prerecorded feeds.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeedConnector: Send + Sync {
    /// Establish a fresh channel.
    async fn connect(&self) -> Result<FrameStream>;
}

/// Live feed over a websocket.
pub struct WebSocketSource {
    url: String,
}

impl WebSocketSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl FeedConnector for WebSocketSource {
    async fn connect(&self) -> Result<FrameStream> {
        let (ws_stream, _) = connect_async(self.url.as_str())
            .await
            .with_context(|| format!("Failed to connect to {}", self.url))?;
        info!(url = %self.url, "Websocket established");

        let frames = ws_stream.filter_map(|msg| async move {
            match msg {
                Ok(Message::Text(text)) => Some(Ok(text.into_bytes())),
                Ok(Message::Binary(data)) => Some(Ok(data)),
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "Close frame received");
                    None
                }
                // Ping/pong are answered by tungstenite itself.
                Ok(_) => None,
                Err(e) => Some(Err(anyhow::Error::from(e))),
            }
        });
        Ok(Box::pin(frames))
    }
}

/// File-based source replaying a JSON-lines capture, one frame per non-empty line.
/// End of file closes the channel, so a reconnect replays the file.
pub struct FileSource {
    path: String,
    replay_delay: Duration,
}

impl FileSource {
    pub fn new(path: impl Into<String>, replay_delay: Duration) -> Self {
        Self {
            path: path.into(),
            replay_delay,
        }
    }
}

#[async_trait]
impl FeedConnector for FileSource {
    async fn connect(&self) -> Result<FrameStream> {
        let file = tokio::fs::File::open(&self.path)
            .await
            .with_context(|| format!("Failed to open replay file {}", self.path))?;
        info!(path = %self.path, "Replaying feed from file");

        let delay = self.replay_delay;
        let frames = SplitStream::new(BufReader::new(file).split(b'\n'))
            .filter(|line| {
                let blank = matches!(line, Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace));
                let keep = !blank;
                async move { keep }
            })
            .then(move |line| async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                line.map_err(anyhow::Error::from)
            });
        Ok(Box::pin(frames))
    }
}

/// Builds the connector described by the configuration.
pub fn connector_from_config(source: &DataSource) -> Box<dyn FeedConnector> {
    match source {
        DataSource::WebSocket { url } => Box::new(WebSocketSource::new(url.clone())),
        DataSource::File {
            path,
            replay_delay_ms,
        } => Box::new(FileSource::new(
            path.clone(),
            Duration::from_millis(*replay_delay_ms),
        )),
    }
}
