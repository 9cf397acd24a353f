//! Pairing state machine for one pipelined connection
//!
//! [`Coordinator`] owns the pending queue and the outbound sink. It does no
//! I/O of its own and has no runtime dependency; whoever holds `&mut` to it is
//! its serialization domain. The actor in `super::actor` is the usual owner.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::command::{Command, Reply};
use crate::completion::Completion;
use crate::error::{CommandError, ConnectionError, ProtocolDesync};
use crate::metrics::{NoopObserver, Observer};
use crate::transport::{OutboundSink, WriteStatus};

use super::config::CoordinatorConfig;
use super::pending::PendingQueue;

/// Lifecycle of a coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    /// Accepting submissions and dispatching replies
    Active,
    /// Connection failed or was shut down; terminal
    Closed,
}

/// Matches replies to submitted commands in FIFO order
pub struct Coordinator<S, V> {
    sink: S,
    pending: PendingQueue<V>,
    state: CoordinatorState,
    next_seq: u64,
    dispatched: u64,
    late_replies: u64,
    observer: Arc<dyn Observer>,
}

impl<S: OutboundSink, V: Reply> Coordinator<S, V> {
    pub fn new(sink: S) -> Self {
        Self::with_config(sink, &CoordinatorConfig::default())
    }

    pub fn with_config(sink: S, config: &CoordinatorConfig) -> Self {
        debug!(initial_queue_capacity = config.initial_queue_capacity, "Coordinator::with_config: called");
        Self {
            sink,
            pending: PendingQueue::with_capacity(config.initial_queue_capacity),
            state: CoordinatorState::Active,
            next_seq: 0,
            dispatched: 0,
            late_replies: 0,
            observer: Arc::new(NoopObserver),
        }
    }

    /// Install an outcome observer
    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    /// Enqueue a completion and write its command
    ///
    /// The enqueue and the write happen in the same call, so queue order is
    /// write order. The sink's write status is passed back unchanged.
    ///
    /// Once closed, the completion is failed with [`CommandError::Closed`]
    /// right away and nothing is written.
    pub fn submit(&mut self, command: Command, completion: Completion<V>) -> Result<WriteStatus, CommandError> {
        if self.is_closed() {
            debug!(len = command.len(), "Coordinator::submit: rejected, coordinator closed");
            self.observer.on_rejected();
            completion.fail(CommandError::Closed);
            return Err(CommandError::Closed);
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push(seq, completion);
        self.observer.on_submit();
        debug!(seq, len = command.len(), pending = self.pending.len(), "Coordinator::submit: enqueued");

        match self.sink.write_outbound(command) {
            Ok(status) => Ok(status),
            Err(err) => {
                warn!(seq, error = %err, "Coordinator::submit: transport write failed");
                self.on_transport_error(err.clone());
                Err(CommandError::Connection(err))
            }
        }
    }

    /// Resolve the oldest pending command with an inbound value
    ///
    /// A value that carries an application error fails only that command.
    /// A value with nothing pending is a protocol desync: the coordinator
    /// closes itself and the desync is returned to the caller. Values that
    /// arrive after close are counted and dropped.
    pub fn on_inbound_value(&mut self, value: V) -> Result<(), ProtocolDesync> {
        if self.is_closed() {
            self.late_replies += 1;
            warn!(late_replies = self.late_replies, "Coordinator: reply after close, discarding");
            self.observer.on_late_reply();
            return Ok(());
        }

        let Some(entry) = self.pending.pop() else {
            let desync = ProtocolDesync {
                dispatched: self.dispatched,
            };
            error!(dispatched = self.dispatched, "Coordinator: reply received with no outstanding command");
            self.observer.on_desync();
            self.on_transport_error(desync.clone().into());
            return Err(desync);
        };

        self.dispatched += 1;
        match value.application_error() {
            Some(err) => {
                debug!(seq = entry.seq, error = %err, "Coordinator::on_inbound_value: remote rejected command");
                self.observer.on_application_error();
                entry.completion.fail(err);
            }
            None => {
                debug!(seq = entry.seq, pending = self.pending.len(), "Coordinator::on_inbound_value: resolved");
                self.observer.on_success();
                entry.completion.succeed(value);
            }
        }
        Ok(())
    }

    /// Fail every pending command with `error` and close the connection
    ///
    /// Only the first call does anything; the coordinator is closed afterwards.
    pub fn on_transport_error(&mut self, error: ConnectionError) {
        if self.is_closed() {
            debug!(%error, "Coordinator::on_transport_error: already closed, ignoring");
            return;
        }

        self.state = CoordinatorState::Closed;
        let drained = self.pending.take_all();
        let count = drained.len();
        if count > 0 {
            warn!(%error, count, "Coordinator: connection failed, failing pending commands");
        } else {
            info!(%error, "Coordinator: connection closed with nothing pending");
        }

        for entry in drained {
            entry.completion.fail(error.clone());
        }
        self.observer.on_drained(count);
        self.sink.close_connection();
    }

    /// Shut down from this side
    pub fn close(&mut self) {
        debug!(pending = self.pending.len(), "Coordinator::close: called");
        self.on_transport_error(ConnectionError::LocalShutdown);
    }
}

impl<S, V> Coordinator<S, V> {
    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == CoordinatorState::Closed
    }

    /// Commands written but not yet answered
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Sequence number the next submission will get
    pub fn next_sequence(&self) -> u64 {
        self.next_seq
    }

    /// Replies paired so far
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    /// Replies dropped because they arrived after close
    pub fn late_replies(&self) -> u64 {
        self.late_replies
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

impl<S, V> Drop for Coordinator<S, V> {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            // Completions drop with us; their callers see Abandoned
            warn!(
                leaked = self.pending.len(),
                oldest_seq = ?self.pending.front_seq(),
                "Coordinator dropped with unresolved commands"
            );
        }
    }
}
