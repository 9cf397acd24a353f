//! Message types for the coordinator actor

use tokio::sync::oneshot;

use crate::command::Command;
use crate::completion::Completion;
use crate::error::{CommandError, ConnectionError};
use crate::metrics::MetricsSnapshot;
use crate::transport::WriteStatus;

use super::core::CoordinatorState;

/// Requests processed, in order, by the coordinator actor
#[derive(Debug)]
pub enum CoordRequest<V> {
    /// Enqueue and write a command (from a handle)
    Submit {
        command: Command,
        completion: Completion<V>,
        ack: oneshot::Sender<Result<WriteStatus, CommandError>>,
    },

    /// Decoded reply from the reader task
    Inbound(V),

    /// Connection-level failure from the reader or writer task
    TransportError(ConnectionError),

    /// Get current metrics
    GetMetrics { reply_tx: oneshot::Sender<MetricsSnapshot> },

    /// Get the coordinator's lifecycle state
    GetState { reply_tx: oneshot::Sender<CoordinatorState> },

    /// Close the connection and stop the actor
    Shutdown,
}

impl<V> CoordRequest<V> {
    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            CoordRequest::Submit { .. } => "submit",
            CoordRequest::Inbound(_) => "inbound",
            CoordRequest::TransportError(_) => "transport-error",
            CoordRequest::GetMetrics { .. } => "get-metrics",
            CoordRequest::GetState { .. } => "get-state",
            CoordRequest::Shutdown => "shutdown",
        }
    }
}
