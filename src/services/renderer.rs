use std::io::Write;
use std::time::Duration;

use thiserror::Error;

use crate::models::PopupSpec;
use crate::services::format::{format_countdown, format_popup_info};
use crate::services::settings::SoundId;

const REPEAT_GAP: Duration = Duration::from_millis(200);

/// Opaque id for an on-screen popup, issued by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PopupHandle(pub u64);

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("audio output unavailable: {0}")]
    Audio(String),

    #[error("popup could not be shown: {0}")]
    Popup(String),
}

/// Audio/visual output. Called only from the control task.
///
/// Implementations must not block: `play` is fire-and-forget and popups are
/// driven by the caller's countdown, not by the renderer.
pub trait Renderer: Send + 'static {
    /// Play `sound` `repeat` times at `volume` (0.0–1.0).
    fn play(&mut self, sound: SoundId, volume: f32, repeat: u8) -> Result<(), RenderError>;

    fn show_popup(&mut self, popup: &PopupSpec) -> Result<PopupHandle, RenderError>;

    /// Called once per countdown tick while the popup is live.
    fn update_countdown(&mut self, _handle: PopupHandle, _remaining_secs: u32) {}

    fn dismiss(&mut self, handle: PopupHandle);
}

/// Headless renderer: rings the terminal bell and prints popups to the log.
#[derive(Debug, Default)]
pub struct ConsoleRenderer {
    next_handle: u64,
}

impl ConsoleRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Renderer for ConsoleRenderer {
    fn play(&mut self, sound: SoundId, volume: f32, repeat: u8) -> Result<(), RenderError> {
        let repeat = repeat.max(1);
        tracing::debug!(sound = %sound, volume, repeat, "Playing alert sound");

        std::thread::Builder::new()
            .name("alert-sound".into())
            .spawn(move || {
                let mut out = std::io::stdout();
                for i in 0..repeat {
                    if let Err(e) = out.write_all(b"\x07").and_then(|_| out.flush()) {
                        tracing::warn!(error = %e, "Terminal bell failed");
                        return;
                    }
                    if i + 1 < repeat {
                        std::thread::sleep(REPEAT_GAP);
                    }
                }
            })
            .map(|_| ())
            .map_err(|e| RenderError::Audio(e.to_string()))
    }

    fn show_popup(&mut self, popup: &PopupSpec) -> Result<PopupHandle, RenderError> {
        self.next_handle += 1;
        let handle = PopupHandle(self.next_handle);

        let info = format_popup_info(popup);
        tracing::info!(
            popup = handle.0,
            "TRADING SIGNAL ▸ {} {}{}{} ({})",
            popup.direction,
            popup.pair,
            if info.is_empty() { "" } else { " │ " },
            info,
            format_countdown(popup.timeout_secs),
        );
        Ok(handle)
    }

    fn update_countdown(&mut self, handle: PopupHandle, remaining_secs: u32) {
        tracing::debug!(popup = handle.0, "{}", format_countdown(remaining_secs));
    }

    fn dismiss(&mut self, handle: PopupHandle) {
        tracing::debug!(popup = handle.0, "Popup closed");
    }
}
