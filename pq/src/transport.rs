//! Outbound side of the transport
//!
//! The coordinator writes through [`OutboundSink`] and never touches sockets
//! directly. [`ChannelSink`] is the tokio implementation: it hands frames to
//! the connection's writer task and reports backpressure once too many bytes
//! are waiting to be written. Closing the sink discards every frame the
//! writer has not started on.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::command::Command;
use crate::error::ConnectionError;

/// Result of handing a command to the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    /// Written or queued, keep going
    Accepted,
    /// Queued, but the transport is above its high-water mark
    Backpressure,
}

impl WriteStatus {
    pub fn is_backpressure(&self) -> bool {
        matches!(self, WriteStatus::Backpressure)
    }
}

/// Where the coordinator sends encoded commands
///
/// Implementations must keep write order across calls.
pub trait OutboundSink {
    fn write_outbound(&mut self, command: Command) -> Result<WriteStatus, ConnectionError>;

    /// Tear down the underlying connection
    fn close_connection(&mut self);
}

impl<S: OutboundSink + ?Sized> OutboundSink for Box<S> {
    fn write_outbound(&mut self, command: Command) -> Result<WriteStatus, ConnectionError> {
        (**self).write_outbound(command)
    }

    fn close_connection(&mut self) {
        (**self).close_connection()
    }
}

/// Sink feeding a writer task through an unbounded channel
pub struct ChannelSink {
    tx: Option<mpsc::UnboundedSender<Command>>,
    queued_bytes: Arc<AtomicUsize>,
    high_water_mark: usize,
    closed: watch::Sender<bool>,
}

/// Receiving end of a [`ChannelSink`], owned by the writer task
pub struct OutboundQueue {
    rx: mpsc::UnboundedReceiver<Command>,
    queued_bytes: Arc<AtomicUsize>,
    closed: watch::Receiver<bool>,
}

impl ChannelSink {
    /// Create a sink and the queue its writer task drains
    pub fn new(high_water_mark: usize) -> (Self, OutboundQueue) {
        debug!(high_water_mark, "ChannelSink::new: called");
        let (tx, rx) = mpsc::unbounded_channel();
        let queued_bytes = Arc::new(AtomicUsize::new(0));
        let (closed, closed_rx) = watch::channel(false);
        let sink = Self {
            tx: Some(tx),
            queued_bytes: queued_bytes.clone(),
            high_water_mark,
            closed,
        };
        let queue = OutboundQueue {
            rx,
            queued_bytes,
            closed: closed_rx,
        };
        (sink, queue)
    }

    /// Bytes accepted but not yet written
    pub fn queued_bytes(&self) -> usize {
        self.queued_bytes.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.as_ref().is_none_or(|tx| tx.is_closed())
    }

    /// Flips to true when the connection is closed from this side
    ///
    /// Also ends (with a receive error) if the sink is dropped.
    pub fn close_signal(&self) -> watch::Receiver<bool> {
        self.closed.subscribe()
    }
}

impl OutboundSink for ChannelSink {
    fn write_outbound(&mut self, command: Command) -> Result<WriteStatus, ConnectionError> {
        let Some(tx) = self.tx.as_ref() else {
            return Err(ConnectionError::LocalShutdown);
        };

        let len = command.len();
        let queued = self.queued_bytes.fetch_add(len, Ordering::AcqRel) + len;
        if tx.send(command).is_err() {
            // Writer task is gone, so the connection is too
            self.queued_bytes.fetch_sub(len, Ordering::AcqRel);
            return Err(ConnectionError::Io(Arc::new(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "writer task stopped",
            ))));
        }

        if queued >= self.high_water_mark {
            debug!(queued, high_water_mark = self.high_water_mark, "ChannelSink: above high-water mark");
            Ok(WriteStatus::Backpressure)
        } else {
            Ok(WriteStatus::Accepted)
        }
    }

    fn close_connection(&mut self) {
        debug!(queued_bytes = self.queued_bytes(), "ChannelSink::close_connection: called");
        // The writer sees the signal, drops unwritten frames and shuts down its half
        self.tx = None;
        self.closed.send_replace(true);
    }
}

impl OutboundQueue {
    /// Next frame to write, or None once the sink is closed
    ///
    /// A close always wins over frames still waiting; those are discarded.
    pub async fn next(&mut self) -> Option<Command> {
        let Self { rx, closed, .. } = self;
        let next = tokio::select! {
            biased;

            _ = wait_closed(closed) => None,
            command = rx.recv() => command,
        };

        if next.is_none() {
            self.close();
        }
        next
    }

    /// Next frame if one is already waiting and the sink is still open
    pub fn try_next(&mut self) -> Option<Command> {
        if self.is_closing() {
            return None;
        }
        self.rx.try_recv().ok()
    }

    /// Check if the sink side has closed the connection
    pub fn is_closing(&self) -> bool {
        *self.closed.borrow()
    }

    /// Mark `len` bytes as written
    pub fn written(&self, len: usize) {
        self.queued_bytes.fetch_sub(len, Ordering::AcqRel);
    }

    /// Stop accepting frames and discard the ones still waiting
    pub fn close(&mut self) {
        self.rx.close();
        let mut discarded = 0usize;
        while let Ok(command) = self.rx.try_recv() {
            self.written(command.len());
            discarded += 1;
        }
        if discarded > 0 {
            debug!(discarded, "OutboundQueue::close: dropped unwritten frames");
        }
    }
}

/// Resolve once the close signal flips; never if the sink is dropped without it
async fn wait_closed(closed: &mut watch::Receiver<bool>) {
    let signalled = closed.wait_for(|closed| *closed).await.is_ok();
    if !signalled {
        std::future::pending::<()>().await;
    }
}
