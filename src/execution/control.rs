use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

use crate::ingestion::FeedSupervisor;
use crate::models::FeedEvent;
use crate::services::{save_settings, AlertSettings, Renderer};

use super::dispatcher::AlertDispatcher;

/// User actions, delivered to the control task.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlCommand {
    Connect,
    Disconnect,
    DismissPopup,
    TestSound,
    TestSignal,
    UpdateSettings(AlertSettings),
    Shutdown,
}

/// The single control task. Feed events, user commands and popup ticks are
/// all handled here one at a time, so the payout cache, popup and counters
/// never see interleaved mutation.
pub async fn run_control_loop<R: Renderer>(
    mut dispatcher: AlertDispatcher<R>,
    mut supervisor: FeedSupervisor,
    mut feed_rx: mpsc::Receiver<FeedEvent>,
    mut cmd_rx: mpsc::Receiver<ControlCommand>,
    settings_path: PathBuf,
) {
    tracing::info!("Control loop started");

    loop {
        let popup_deadline = dispatcher.popup_deadline();

        tokio::select! {
            biased;

            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else {
                    tracing::warn!("Control command channel closed");
                    break;
                };
                if !handle_command(cmd, &mut dispatcher, &mut supervisor, &settings_path).await {
                    break;
                }
            }
            // Ahead of the feed so a frame burst cannot stall the countdown.
            _ = wait_for_tick(popup_deadline) => {
                dispatcher.on_popup_tick();
            }
            event = feed_rx.recv() => {
                match event {
                    Some(event) => dispatcher.handle_feed_event(event),
                    // The supervisor holds a sender, so this only happens on teardown.
                    None => break,
                }
            }
        }
    }

    persist(&settings_path, dispatcher.settings());
    // Unblock a receive loop waiting for channel room before joining it.
    feed_rx.close();
    while feed_rx.try_recv().is_ok() {}
    supervisor.shutdown().await;
    dispatcher.shutdown();
    tracing::info!("Control loop stopped");
}

/// Returns false when the loop should exit.
async fn handle_command<R: Renderer>(
    cmd: ControlCommand,
    dispatcher: &mut AlertDispatcher<R>,
    supervisor: &mut FeedSupervisor,
    settings_path: &Path,
) -> bool {
    match cmd {
        ControlCommand::Connect => {
            persist(settings_path, dispatcher.settings());
            supervisor.start().await;
        }
        ControlCommand::Disconnect => supervisor.stop(),
        ControlCommand::DismissPopup => {
            dispatcher.dismiss_popup();
        }
        ControlCommand::TestSound => dispatcher.test_sound(),
        ControlCommand::TestSignal => {
            dispatcher.test_signal();
        }
        ControlCommand::UpdateSettings(settings) => dispatcher.set_settings(settings),
        ControlCommand::Shutdown => {
            tracing::info!("Shutdown requested");
            return false;
        }
    }
    true
}

async fn wait_for_tick(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn persist(path: &Path, settings: &AlertSettings) {
    if let Err(e) = save_settings(path, settings) {
        tracing::warn!(error = %e, path = %path.display(), "Failed to save settings");
    }
}
