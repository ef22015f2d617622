pub mod api;
pub mod config;
pub mod errors;
pub mod execution;
pub mod ingestion;
pub mod intelligence;
pub mod metrics;
pub mod models;
pub mod services;

use tokio::sync::{mpsc, watch};

use crate::execution::{ControlCommand, DispatcherConfig, DispatcherStatus};
use crate::models::ConnectionState;

/// Shared state for the control surface. Everything here is a handle onto
/// the control task; no handler touches alert state directly.
#[derive(Clone)]
pub struct AppState {
    pub commands: mpsc::Sender<ControlCommand>,
    pub connection: watch::Receiver<ConnectionState>,
    pub status: watch::Receiver<DispatcherStatus>,
    pub thresholds: DispatcherConfig,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
    /// Bearer token required on `/api` and `/ws` routes; `None` disables auth.
    pub api_token: Option<String>,
}
