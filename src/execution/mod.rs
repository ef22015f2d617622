pub mod control;
pub mod dispatcher;
pub mod popup;

pub use control::{run_control_loop, ControlCommand};
pub use dispatcher::{
    AlertDispatcher, DispatchOutcome, DispatcherConfig, DispatcherStatus, PopupOutcome,
    DEFAULT_MIN_POPUP_WIN_RATE,
};
pub use popup::{ActivePopup, PopupEnd, PopupStatus, PopupTick};
