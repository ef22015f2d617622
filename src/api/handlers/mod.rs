pub mod control;
pub mod health;
pub mod metrics;
pub mod settings;
pub mod ws;
