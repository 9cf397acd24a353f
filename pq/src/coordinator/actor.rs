//! Coordinator actor - the serialization domain for one connection
//!
//! Handles, the reader task and the writer task never touch the
//! [`Coordinator`] directly. They send [`CoordRequest`]s to this task, which
//! applies them one at a time in arrival order.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::command::Reply;
use crate::metrics::CoordinatorMetrics;
use crate::transport::OutboundSink;

use super::config::CoordinatorConfig;
use super::core::Coordinator;
use super::handle::CoordinatorHandle;
use super::messages::CoordRequest;

/// Task owning one [`Coordinator`]
pub struct CoordinatorActor<S, V> {
    coordinator: Coordinator<S, V>,
    metrics: Arc<CoordinatorMetrics>,
    tx: mpsc::Sender<CoordRequest<V>>,
    rx: mpsc::Receiver<CoordRequest<V>>,
}

impl<S, V> CoordinatorActor<S, V>
where
    S: OutboundSink + Send + 'static,
    V: Reply,
{
    /// Create an actor writing to `sink`
    pub fn new(sink: S, config: &CoordinatorConfig) -> Self {
        let metrics = Arc::new(CoordinatorMetrics::new());
        let coordinator = Coordinator::with_config(sink, config).with_observer(metrics.clone());
        let (tx, rx) = mpsc::channel(config.channel_buffer);
        Self {
            coordinator,
            metrics,
            tx,
            rx,
        }
    }

    /// Get a sender for transport tasks
    pub fn sender(&self) -> mpsc::Sender<CoordRequest<V>> {
        self.tx.clone()
    }

    /// Create a caller-facing handle
    pub fn handle(&self) -> CoordinatorHandle<V> {
        CoordinatorHandle::new(self.tx.clone())
    }

    /// Run until shutdown is requested or every sender is gone
    ///
    /// The actor outlives the connection: after a transport error it keeps
    /// answering submissions with `Closed` until its callers let go.
    pub async fn run(self) {
        let Self {
            mut coordinator,
            metrics,
            tx,
            mut rx,
        } = self;
        // Only external senders keep the actor alive
        drop(tx);

        info!("Coordinator actor started");

        while let Some(req) = rx.recv().await {
            debug!(kind = req.kind(), pending = coordinator.pending_len(), "Coordinator actor: request");

            match req {
                CoordRequest::Submit {
                    command,
                    completion,
                    ack,
                } => {
                    let result = coordinator.submit(command, completion);
                    let _ = ack.send(result);
                }

                CoordRequest::Inbound(value) => {
                    if let Err(desync) = coordinator.on_inbound_value(value) {
                        error!(%desync, "Coordinator actor: connection torn down after protocol desync");
                    }
                }

                CoordRequest::TransportError(err) => {
                    coordinator.on_transport_error(err);
                }

                CoordRequest::GetMetrics { reply_tx } => {
                    let _ = reply_tx.send(metrics.snapshot(coordinator.pending_len()));
                }

                CoordRequest::GetState { reply_tx } => {
                    let _ = reply_tx.send(coordinator.state());
                }

                CoordRequest::Shutdown => {
                    info!("Coordinator actor: shutdown requested");
                    coordinator.close();
                    break;
                }
            }
        }

        if !coordinator.is_closed() {
            debug!("Coordinator actor: all senders dropped, closing");
            coordinator.close();
        }

        info!("Coordinator actor stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::command::Command;
    use crate::error::{CommandError, ConnectionError};
    use crate::transport::ChannelSink;

    use crate::coordinator::CoordinatorState;

    fn spawn_actor() -> (
        CoordinatorHandle<String>,
        mpsc::Sender<CoordRequest<String>>,
        crate::transport::OutboundQueue,
        tokio::task::JoinHandle<()>,
    ) {
        let (sink, queue) = ChannelSink::new(1024);
        let actor = CoordinatorActor::new(sink, &CoordinatorConfig::default());
        let handle = actor.handle();
        let inbound = actor.sender();
        let task = tokio::spawn(actor.run());
        (handle, inbound, queue, task)
    }

    #[tokio::test]
    async fn test_actor_pairs_replies() {
        let (handle, inbound, mut queue, _task) = spawn_actor();

        let first = handle.submit(Command::from("one")).await.unwrap();
        let second = handle.submit(Command::from("two")).await.unwrap();
        assert_eq!(queue.next().await.unwrap().as_bytes(), b"one");
        assert_eq!(queue.next().await.unwrap().as_bytes(), b"two");

        inbound.send(CoordRequest::Inbound("1".to_string())).await.unwrap();
        inbound.send(CoordRequest::Inbound("2".to_string())).await.unwrap();

        assert_eq!(first.reply.await.unwrap(), "1");
        assert_eq!(second.reply.await.unwrap(), "2");
    }

    #[tokio::test]
    async fn test_transport_error_then_fail_fast() {
        let (handle, inbound, _queue, _task) = spawn_actor();

        let pending = handle.submit(Command::from("stuck")).await.unwrap();
        assert_eq!(handle.state().await, CoordinatorState::Active);
        inbound
            .send(CoordRequest::TransportError(ConnectionError::PeerClosed))
            .await
            .unwrap();

        assert!(matches!(
            pending.reply.await,
            Err(CommandError::Connection(ConnectionError::PeerClosed))
        ));
        assert!(matches!(handle.submit(Command::from("late")).await, Err(CommandError::Closed)));

        // The actor is still answering, but the connection is gone
        assert!(!handle.is_actor_stopped());
        assert!(handle.is_closed().await);
        assert_eq!(handle.state().await, CoordinatorState::Closed);

        let snap = handle.metrics().await.unwrap();
        assert_eq!(snap.drained, 1);
        assert_eq!(snap.rejected, 1);
    }

    #[tokio::test]
    async fn test_desync_closes_connection() {
        let (handle, inbound, mut queue, _task) = spawn_actor();

        inbound.send(CoordRequest::Inbound("surprise".to_string())).await.unwrap();

        // Sink closed by the teardown, so the writer side sees the end of the queue
        let ended = tokio::time::timeout(Duration::from_secs(1), queue.next()).await.unwrap();
        assert!(ended.is_none());

        let snap = handle.metrics().await.unwrap();
        assert_eq!(snap.desyncs, 1);
        assert!(matches!(handle.call(Command::from("after")).await, Err(CommandError::Closed)));
    }

    #[tokio::test]
    async fn test_shutdown_fails_pending_and_stops() {
        let (handle, _inbound, _queue, task) = spawn_actor();

        let pending = handle.submit(Command::from("waiting")).await.unwrap();
        handle.shutdown().await.unwrap();

        assert!(matches!(
            pending.reply.await,
            Err(CommandError::Connection(ConnectionError::LocalShutdown))
        ));
        tokio::time::timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
        assert!(handle.is_actor_stopped());
        assert!(handle.is_closed().await);
        assert!(matches!(handle.submit(Command::from("gone")).await, Err(CommandError::Closed)));
    }

    #[tokio::test]
    async fn test_actor_stops_when_senders_dropped() {
        let (handle, inbound, _queue, task) = spawn_actor();

        let pending = handle.submit(Command::from("orphan")).await.unwrap();
        drop(handle);
        drop(inbound);

        tokio::time::timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
        assert!(matches!(
            pending.reply.await,
            Err(CommandError::Connection(ConnectionError::LocalShutdown))
        ));
    }
}
