//! Completion slots - one per submitted command
//!
//! A [`Completion`] is the resolving side and stays with the coordinator; the
//! matching [`ReplyFuture`] goes to the caller. Resolving consumes the
//! completion, so a slot can never be resolved twice.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::CommandError;

/// What a caller eventually receives for one command
pub type Outcome<V> = Result<V, CommandError>;

/// Resolving side of a single-assignment slot
#[derive(Debug)]
pub struct Completion<V> {
    tx: oneshot::Sender<Outcome<V>>,
}

impl<V> Completion<V> {
    /// Create a connected completion / future pair
    pub fn channel() -> (Completion<V>, ReplyFuture<V>) {
        let (tx, rx) = oneshot::channel();
        (Completion { tx }, ReplyFuture { rx })
    }

    /// Resolve the slot
    ///
    /// Returns false if the caller already dropped its future. That is not an
    /// error: the slot still counts as resolved.
    pub fn resolve(self, outcome: Outcome<V>) -> bool {
        self.tx.send(outcome).is_ok()
    }

    pub fn succeed(self, value: V) -> bool {
        self.resolve(Ok(value))
    }

    pub fn fail(self, err: impl Into<CommandError>) -> bool {
        self.resolve(Err(err.into()))
    }

    /// Check if nobody is waiting on this slot anymore
    pub fn is_abandoned(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Awaitable side of a completion slot
///
/// Resolves to [`CommandError::Abandoned`] if the completion is dropped
/// without being resolved.
#[derive(Debug)]
pub struct ReplyFuture<V> {
    rx: oneshot::Receiver<Outcome<V>>,
}

impl<V> ReplyFuture<V> {
    /// Take the outcome if it is already available, without waiting
    pub fn try_take(&mut self) -> Option<Outcome<V>> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(CommandError::Abandoned)),
        }
    }
}

impl<V> Future for ReplyFuture<V> {
    type Output = Outcome<V>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(CommandError::Abandoned)))
    }
}
