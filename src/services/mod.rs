pub mod format;
pub mod renderer;
pub mod settings;

pub use renderer::{ConsoleRenderer, PopupHandle, RenderError, Renderer};
pub use settings::{load_settings, save_settings, AlertSettings, SoundId};
