pub mod frame;
pub mod supervisor;
pub mod ws_listener;

pub use frame::decode_frame;
pub use supervisor::FeedSupervisor;
pub use ws_listener::{ConnectionManager, FeedConfig, FeedError, StopFlag};
