use serde::Serialize;

use crate::execution::DispatcherStatus;
use crate::models::ConnectionState;

/// Messages pushed to connected status clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum WsMessage {
    #[serde(rename = "connection")]
    Connection(ConnectionState),

    #[serde(rename = "status")]
    Status(DispatcherStatus),
}
