use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::models::{ConnectionState, FeedEvent};

use super::ws_listener::{ConnectionManager, FeedConfig, StopFlag};

struct FeedTask {
    stop: StopFlag,
    handle: JoinHandle<()>,
}

/// Starts and stops the connection task on user request.
///
/// At most one connection task runs at a time: a start waits for any
/// previous task to finish winding down before spawning the next.
pub struct FeedSupervisor {
    config: FeedConfig,
    events_tx: mpsc::Sender<FeedEvent>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    active: Option<FeedTask>,
}

impl FeedSupervisor {
    pub fn new(config: FeedConfig, events_tx: mpsc::Sender<FeedEvent>) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            config,
            events_tx,
            state_tx: Arc::new(state_tx),
            active: None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Whether a connection task is alive and has not been asked to stop.
    pub fn is_running(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|t| !t.stop.is_requested() && !t.handle.is_finished())
    }

    /// User-initiated start. No-op if a connection is already running.
    pub async fn start(&mut self) {
        if self.is_running() {
            tracing::debug!("Connect requested while already running");
            return;
        }
        self.join_previous().await;

        let stop = StopFlag::new();
        let manager = ConnectionManager::new(
            self.config.clone(),
            stop.clone(),
            Arc::clone(&self.state_tx),
            self.events_tx.clone(),
        );
        let handle = tokio::spawn(manager.run());
        self.active = Some(FeedTask { stop, handle });
    }

    /// User-initiated stop. Returns immediately; the task notices the flag
    /// within one poll interval and closes its transport.
    pub fn stop(&mut self) {
        if let Some(task) = &self.active {
            task.stop.request();
        }
        let prev = self.state_tx.send_replace(ConnectionState::Disconnected);
        if prev != ConnectionState::Disconnected {
            tracing::info!(from = %prev, to = %ConnectionState::Disconnected, "Connection state changed");
        }
    }

    /// Stop and wait for the connection task to exit.
    pub async fn shutdown(&mut self) {
        self.stop();
        self.join_previous().await;
    }

    async fn join_previous(&mut self) {
        if let Some(task) = self.active.take() {
            task.stop.request();
            if let Err(e) = task.handle.await {
                tracing::error!(error = %e, "Connection task panicked");
            }
        }
    }
}
