use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::{accept_async, tungstenite::Message};

use signal_alert::models::{PopupSpec, RawSignal};
use signal_alert::services::{PopupHandle, RenderError, Renderer, SoundId};

// ---------------------------------------------------------------------------
// Recording renderer
// ---------------------------------------------------------------------------

#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCall {
    Play {
        sound: SoundId,
        volume: f32,
        repeat: u8,
    },
    Show {
        handle: PopupHandle,
        spec: PopupSpec,
    },
    Countdown {
        handle: PopupHandle,
        remaining_secs: u32,
    },
    Dismiss(PopupHandle),
}

/// Renderer that records every call. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    calls: Arc<Mutex<Vec<RenderCall>>>,
    next_handle: Arc<AtomicU64>,
    fail_audio: Arc<AtomicBool>,
    fail_popup: Arc<AtomicBool>,
}

#[allow(dead_code)]
impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_audio(&self, fail: bool) {
        self.fail_audio.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_popup(&self, fail: bool) {
        self.fail_popup.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<RenderCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn play_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, RenderCall::Play { .. }))
            .count()
    }

    pub fn shown(&self) -> Vec<(PopupHandle, PopupSpec)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                RenderCall::Show { handle, spec } => Some((handle, spec)),
                _ => None,
            })
            .collect()
    }

    pub fn dismissed(&self) -> Vec<PopupHandle> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                RenderCall::Dismiss(handle) => Some(handle),
                _ => None,
            })
            .collect()
    }

    /// Popups shown and not yet dismissed.
    pub fn live_popups(&self) -> Vec<PopupHandle> {
        let dismissed = self.dismissed();
        self.shown()
            .into_iter()
            .map(|(handle, _)| handle)
            .filter(|h| !dismissed.contains(h))
            .collect()
    }

    pub fn countdowns_for(&self, handle: PopupHandle) -> Vec<u32> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                RenderCall::Countdown {
                    handle: h,
                    remaining_secs,
                } if h == handle => Some(remaining_secs),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: RenderCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Renderer for RecordingRenderer {
    fn play(&mut self, sound: SoundId, volume: f32, repeat: u8) -> Result<(), RenderError> {
        if self.fail_audio.load(Ordering::SeqCst) {
            return Err(RenderError::Audio("device busy".into()));
        }
        self.record(RenderCall::Play {
            sound,
            volume,
            repeat,
        });
        Ok(())
    }

    fn show_popup(&mut self, popup: &PopupSpec) -> Result<PopupHandle, RenderError> {
        if self.fail_popup.load(Ordering::SeqCst) {
            return Err(RenderError::Popup("no display".into()));
        }
        let handle = PopupHandle(self.next_handle.fetch_add(1, Ordering::SeqCst) + 1);
        self.record(RenderCall::Show {
            handle,
            spec: popup.clone(),
        });
        Ok(handle)
    }

    fn update_countdown(&mut self, handle: PopupHandle, remaining_secs: u32) {
        self.record(RenderCall::Countdown {
            handle,
            remaining_secs,
        });
    }

    fn dismiss(&mut self, handle: PopupHandle) {
        self.record(RenderCall::Dismiss(handle));
    }
}

// ---------------------------------------------------------------------------
// Signal builders
// ---------------------------------------------------------------------------

#[allow(dead_code)]
pub fn payout_frame(pairs: &[(&str, f64)]) -> String {
    let pairs: Vec<_> = pairs
        .iter()
        .map(|(pair, payout)| serde_json::json!({ "pair": pair, "payout": payout }))
        .collect();
    serde_json::json!({ "type": "payout_update", "data": { "pairs": pairs } }).to_string()
}

#[allow(dead_code)]
pub fn div_alert_frame(symbol: &str, direction: &str, win_rate: Option<f64>) -> String {
    let mut data = serde_json::json!({
        "alert": "DIV_FORMING",
        "symbol": symbol,
        "direction": direction,
        "_server_filtered": true,
    });
    if let Some(wr) = win_rate {
        data["backtest"] = serde_json::json!({
            "by_time": { "current_best": { "wr": wr, "tf": "5", "expiry": 6 } }
        });
    }
    serde_json::json!({ "type": "div_alert", "data": data }).to_string()
}

#[allow(dead_code)]
pub fn raw_signal(frame: &str) -> RawSignal {
    let value: serde_json::Value = serde_json::from_str(frame).unwrap();
    serde_json::from_value(value["data"].clone()).unwrap()
}

// ---------------------------------------------------------------------------
// Mock feed server
// ---------------------------------------------------------------------------

/// What the server does once it has answered the auth message.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterAuth {
    /// Keep the connection open and forward pushed frames.
    Hold,
    /// Send a close frame right away.
    Close,
}

#[derive(Debug, Clone)]
pub struct FeedScript {
    pub auth_reply: String,
    pub frames: Vec<String>,
    pub after_auth: AfterAuth,
}

impl Default for FeedScript {
    fn default() -> Self {
        Self {
            auth_reply: r#"{"status":"ok"}"#.into(),
            frames: Vec::new(),
            after_auth: AfterAuth::Hold,
        }
    }
}

/// In-process feed server speaking the auth-then-frames protocol.
pub struct MockFeedServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    push_tx: broadcast::Sender<String>,
    auth_messages: Arc<Mutex<Vec<String>>>,
    connections: Arc<AtomicU32>,
    client_closes: Arc<AtomicU32>,
}

#[allow(dead_code)]
impl MockFeedServer {
    pub async fn start(script: FeedScript) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let (push_tx, _) = broadcast::channel::<String>(64);
        let auth_messages = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicU32::new(0));
        let client_closes = Arc::new(AtomicU32::new(0));

        let ctx = ConnCtx {
            script,
            push_tx: push_tx.clone(),
            auth_messages: auth_messages.clone(),
            connections: connections.clone(),
            client_closes: client_closes.clone(),
        };

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((stream, _)) = listener.accept() => {
                        tokio::spawn(handle_connection(stream, ctx.clone()));
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            push_tx,
            auth_messages,
            connections,
            client_closes,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub fn connection_count(&self) -> u32 {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn client_close_count(&self) -> u32 {
        self.client_closes.load(Ordering::SeqCst)
    }

    pub fn auth_messages(&self) -> Vec<String> {
        self.auth_messages.lock().unwrap().clone()
    }

    /// Send a frame to every connection that has passed auth.
    pub fn push(&self, frame: impl Into<String>) {
        let _ = self.push_tx.send(frame.into());
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

#[derive(Clone)]
struct ConnCtx {
    script: FeedScript,
    push_tx: broadcast::Sender<String>,
    auth_messages: Arc<Mutex<Vec<String>>>,
    connections: Arc<AtomicU32>,
    client_closes: Arc<AtomicU32>,
}

async fn handle_connection(stream: TcpStream, ctx: ConnCtx) {
    ctx.connections.fetch_add(1, Ordering::SeqCst);

    let ws = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("WebSocket handshake failed: {e}");
            return;
        }
    };
    let (mut write, mut read) = ws.split();

    let auth = loop {
        match read.next().await {
            Some(Ok(Message::Text(text))) => break text.as_str().to_owned(),
            Some(Ok(_)) => continue,
            _ => return,
        }
    };
    ctx.auth_messages.lock().unwrap().push(auth);

    // Subscribe before replying so no pushed frame is missed.
    let mut push_rx = ctx.push_tx.subscribe();

    if write
        .send(Message::Text(ctx.script.auth_reply.clone().into()))
        .await
        .is_err()
    {
        return;
    }

    for frame in &ctx.script.frames {
        if write.send(Message::Text(frame.clone().into())).await.is_err() {
            return;
        }
    }

    if ctx.script.after_auth == AfterAuth::Close {
        let _ = write.send(Message::Close(None)).await;
        return;
    }

    loop {
        tokio::select! {
            pushed = push_rx.recv() => {
                match pushed {
                    Ok(frame) => {
                        if write.send(Message::Text(frame.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => {
                        ctx.client_closes.fetch_add(1, Ordering::SeqCst);
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }
}

/// Poll `cond` every 20 ms until it holds or `within` elapses.
#[allow(dead_code)]
pub async fn eventually<F: FnMut() -> bool>(within: Duration, mut cond: F) -> bool {
    let deadline = tokio::time::Instant::now() + within;
    loop {
        if cond() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
