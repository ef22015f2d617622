use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::SplitStream;
use futures_util::{SinkExt, StreamExt};
use metrics::counter;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::{timeout, Instant};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::models::{ConnectionState, FeedEvent};

use super::frame::decode_frame;

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

type FeedStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub url: String,
    pub api_key: String,
    /// Fixed wait between a lost connection and the next attempt.
    pub reconnect_delay: Duration,
    /// Granularity at which blocking waits re-check the stop flag.
    pub poll_interval: Duration,
}

impl FeedConfig {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Cooperative stop request shared with a running connection.
/// Setting it more than once is harmless.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("connect failed: {0}")]
    Connect(#[source] tungstenite::Error),

    #[error("transport error: {0}")]
    Transport(#[source] tungstenite::Error),

    #[error("connection closed by server")]
    Closed,

    #[error("invalid auth reply: {0}")]
    AuthReply(#[source] serde_json::Error),

    #[error("authentication rejected: {0}")]
    AuthRejected(String),
}

/// How one connect-authenticate-receive session ended.
enum SessionEnd {
    Stopped,
    AuthRejected(String),
    Lost(FeedError),
}

/// Owns the feed connection: connect, authenticate, receive, and reconnect
/// after a fixed backoff until stopped or the server rejects the key.
///
/// The receive loop only decodes and classifies frames; classified events go
/// to the control task over `events_tx` in arrival order.
pub struct ConnectionManager {
    config: FeedConfig,
    stop: StopFlag,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    events_tx: mpsc::Sender<FeedEvent>,
}

impl ConnectionManager {
    pub fn new(
        config: FeedConfig,
        stop: StopFlag,
        state_tx: Arc<watch::Sender<ConnectionState>>,
        events_tx: mpsc::Sender<FeedEvent>,
    ) -> Self {
        Self {
            config,
            stop,
            state_tx,
            events_tx,
        }
    }

    /// Run until stopped or authentication fails. Ends in `Disconnected`
    /// (stop requested) or `Failed` (key rejected).
    pub async fn run(self) {
        loop {
            if self.stop.is_requested() {
                break;
            }

            self.set_state(ConnectionState::Connecting);
            tracing::info!(url = %self.config.url, "Connecting to signal server...");

            match self.session().await {
                SessionEnd::Stopped => break,
                SessionEnd::AuthRejected(reason) => {
                    tracing::error!(reason = %reason, "Auth failed");
                    self.set_state(ConnectionState::Failed);
                    return;
                }
                SessionEnd::Lost(e) => {
                    if self.stop.is_requested() {
                        break;
                    }
                    counter!("feed_reconnects_total").increment(1);
                    tracing::warn!(
                        error = %e,
                        delay_secs = self.config.reconnect_delay.as_secs_f64(),
                        "Connection lost. Reconnecting..."
                    );
                    self.set_state(ConnectionState::Reconnecting);
                    if !self.backoff().await {
                        break;
                    }
                }
            }
        }

        self.set_state(ConnectionState::Disconnected);
        tracing::info!("Disconnected");
    }

    async fn session(&self) -> SessionEnd {
        let ws = match self.until_stopped(connect_async(self.config.url.as_str())).await {
            None => return SessionEnd::Stopped,
            Some(Err(e)) => return SessionEnd::Lost(FeedError::Connect(e)),
            Some(Ok((ws, _response))) => ws,
        };

        self.set_state(ConnectionState::Authenticating);
        let (mut write, mut read) = ws.split();

        let auth = json!({ "api_key": self.config.api_key }).to_string();
        match self.until_stopped(write.send(Message::Text(auth.into()))).await {
            None => return SessionEnd::Stopped,
            Some(Err(e)) => return SessionEnd::Lost(FeedError::Transport(e)),
            Some(Ok(())) => {}
        }

        let reply = match self.until_stopped(next_text(&mut read)).await {
            None => return SessionEnd::Stopped,
            Some(Err(e)) => return SessionEnd::Lost(e),
            Some(Ok(text)) => text,
        };

        match parse_auth_reply(&reply) {
            Ok(()) => {}
            Err(FeedError::AuthRejected(reason)) => {
                let _ = timeout(self.config.poll_interval, write.close()).await;
                return SessionEnd::AuthRejected(reason);
            }
            Err(e) => return SessionEnd::Lost(e),
        }

        self.set_state(ConnectionState::Connected);
        tracing::info!("Connected! Waiting for signals...");

        loop {
            let msg = match self.until_stopped(read.next()).await {
                None => {
                    let _ = timeout(self.config.poll_interval, write.close()).await;
                    return SessionEnd::Stopped;
                }
                Some(msg) => msg,
            };

            match msg {
                Some(Ok(Message::Text(text))) => {
                    if !self.forward_frame(text.as_str()).await {
                        let _ = timeout(self.config.poll_interval, write.close()).await;
                        return SessionEnd::Stopped;
                    }
                }
                Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                    Ok(text) => {
                        if !self.forward_frame(text).await {
                            let _ = timeout(self.config.poll_interval, write.close()).await;
                            return SessionEnd::Stopped;
                        }
                    }
                    Err(_) => {
                        counter!("feed_frames_malformed_total").increment(1);
                        tracing::debug!(len = bytes.len(), "Dropping non-UTF-8 binary frame");
                    }
                },
                Some(Ok(Message::Ping(data))) => {
                    if let Err(e) = write.send(Message::Pong(data)).await {
                        return SessionEnd::Lost(FeedError::Transport(e));
                    }
                }
                Some(Ok(Message::Close(_))) => return SessionEnd::Lost(FeedError::Closed),
                Some(Ok(_)) => {} // Pong, Frame
                Some(Err(e)) => return SessionEnd::Lost(FeedError::Transport(e)),
                None => return SessionEnd::Lost(FeedError::Closed),
            }
        }
    }

    /// Decode one frame and pass it on. Malformed frames are logged and
    /// dropped. Returns false once the control task has gone away or a stop
    /// was requested while waiting for room in the event channel.
    async fn forward_frame(&self, text: &str) -> bool {
        match decode_frame(text) {
            Ok(Some(event)) => match self.until_stopped(self.events_tx.send(event)).await {
                None => return false,
                Some(Err(_)) => {
                    tracing::warn!("Feed event channel closed");
                    return false;
                }
                Some(Ok(())) => {}
            },
            Ok(None) => {
                tracing::trace!(raw = %text, "Ignoring frame of unhandled type");
            }
            Err(e) => {
                counter!("feed_frames_malformed_total").increment(1);
                tracing::debug!(error = %e, raw = %text, "Dropping malformed frame");
            }
        }
        true
    }

    /// Drive `fut` to completion, giving up if a stop is requested. The stop
    /// flag is re-checked every poll interval.
    async fn until_stopped<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::pin!(fut);
        loop {
            if self.stop.is_requested() {
                return None;
            }
            match timeout(self.config.poll_interval, fut.as_mut()).await {
                Ok(output) => return Some(output),
                Err(_) => continue,
            }
        }
    }

    /// Sleep for the reconnect delay in poll-sized slices. Returns false if a
    /// stop was requested meanwhile.
    async fn backoff(&self) -> bool {
        let deadline = Instant::now() + self.config.reconnect_delay;
        loop {
            if self.stop.is_requested() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            let slice = (deadline - now).min(self.config.poll_interval);
            tokio::time::sleep(slice).await;
        }
    }

    fn set_state(&self, next: ConnectionState) {
        // Once stopped, only the final Disconnected is published.
        if self.stop.is_requested() && next != ConnectionState::Disconnected {
            return;
        }
        let prev = self.state_tx.send_replace(next);
        // A stop may have landed between the check and the publish; its
        // Disconnected must win.
        if next != ConnectionState::Disconnected && self.stop.is_requested() {
            self.state_tx.send_replace(ConnectionState::Disconnected);
            return;
        }
        if prev != next {
            tracing::info!(from = %prev, to = %next, "Connection state changed");
        }
    }
}

/// Wait for the next data frame as text, skipping ping/pong and other control
/// frames.
async fn next_text(read: &mut SplitStream<FeedStream>) -> Result<String, FeedError> {
    loop {
        match read.next().await {
            Some(Ok(Message::Text(text))) => return Ok(text.as_str().to_owned()),
            Some(Ok(Message::Binary(bytes))) => {
                return Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
            Some(Ok(Message::Close(_))) | None => return Err(FeedError::Closed),
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(FeedError::Transport(e)),
        }
    }
}

/// A reply carrying an `error` field rejects the key; anything else that is
/// valid JSON accepts it.
pub fn parse_auth_reply(reply: &str) -> Result<(), FeedError> {
    let value: Value = serde_json::from_str(reply).map_err(FeedError::AuthReply)?;
    match value.get("error") {
        Some(Value::String(reason)) => Err(FeedError::AuthRejected(reason.clone())),
        Some(other) => Err(FeedError::AuthRejected(other.to_string())),
        None => Ok(()),
    }
}
