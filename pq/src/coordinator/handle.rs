//! CoordinatorHandle - Client interface for submitting commands

use eyre::{Result, eyre};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::command::{Command, Reply};
use crate::completion::{Completion, ReplyFuture};
use crate::error::CommandError;
use crate::metrics::MetricsSnapshot;
use crate::transport::WriteStatus;

use super::core::CoordinatorState;
use super::messages::CoordRequest;

/// A command that made it onto the connection
#[derive(Debug)]
pub struct Submitted<V> {
    /// Transport write status at the time of submission
    pub status: WriteStatus,

    /// Resolves once the matching reply (or a connection error) arrives
    pub reply: ReplyFuture<V>,
}

/// Handle for callers to pipeline commands over one connection
///
/// Cheap to clone; every clone talks to the same coordinator actor.
pub struct CoordinatorHandle<V> {
    tx: mpsc::Sender<CoordRequest<V>>,
}

impl<V> Clone for CoordinatorHandle<V> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl<V: Reply> CoordinatorHandle<V> {
    pub(crate) fn new(tx: mpsc::Sender<CoordRequest<V>>) -> Self {
        debug!("CoordinatorHandle::new: called");
        Self { tx }
    }

    /// Submit a command without waiting for its reply
    ///
    /// Returns once the command is queued on the connection. Await
    /// [`Submitted::reply`] for the outcome.
    pub async fn submit(&self, command: Command) -> Result<Submitted<V>, CommandError> {
        debug!(len = command.len(), "CoordinatorHandle::submit: called");
        let (completion, reply) = Completion::channel();
        let (ack_tx, ack_rx) = oneshot::channel();

        self.tx
            .send(CoordRequest::Submit {
                command,
                completion,
                ack: ack_tx,
            })
            .await
            .map_err(|_| CommandError::Closed)?;

        let status = ack_rx.await.map_err(|_| CommandError::Closed)??;
        if status.is_backpressure() {
            debug!("CoordinatorHandle::submit: transport reports backpressure");
        }
        Ok(Submitted { status, reply })
    }

    /// Submit a command and wait for its reply
    pub async fn call(&self, command: Command) -> Result<V, CommandError> {
        let submitted = self.submit(command).await?;
        submitted.reply.await
    }

    /// Get current coordinator metrics
    pub async fn metrics(&self) -> Result<MetricsSnapshot> {
        debug!("CoordinatorHandle::metrics: called");
        let (reply_tx, reply_rx) = oneshot::channel();

        self.tx
            .send(CoordRequest::GetMetrics { reply_tx })
            .await
            .map_err(|_| eyre!("Coordinator channel closed"))?;

        reply_rx.await.map_err(|_| eyre!("Coordinator shutdown before reply"))
    }

    /// Close the connection, failing whatever is still pending
    pub async fn shutdown(&self) -> Result<()> {
        debug!("CoordinatorHandle::shutdown: called");
        self.tx
            .send(CoordRequest::Shutdown)
            .await
            .map_err(|_| eyre!("Coordinator channel closed"))?;
        Ok(())
    }

    /// Lifecycle state of the coordinator
    ///
    /// A stopped actor reports [`CoordinatorState::Closed`].
    pub async fn state(&self) -> CoordinatorState {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.tx.send(CoordRequest::GetState { reply_tx }).await.is_err() {
            return CoordinatorState::Closed;
        }
        reply_rx.await.unwrap_or(CoordinatorState::Closed)
    }

    /// Check if submissions will be refused
    pub async fn is_closed(&self) -> bool {
        self.state().await == CoordinatorState::Closed
    }

    /// Check if the coordinator actor task has stopped
    ///
    /// The actor outlives a failed connection, so this can be false while
    /// [`is_closed`](Self::is_closed) is true.
    pub fn is_actor_stopped(&self) -> bool {
        self.tx.is_closed()
    }
}
