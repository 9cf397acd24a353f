//! Error types for the coordinator and its collaborators

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::command::ApplicationError;

/// Terminal failure of a whole connection
///
/// Cloned once per pending command when the queue is drained, so every
/// outstanding caller observes the same failure.
#[derive(Debug, Clone, Error)]
pub enum ConnectionError {
    #[error("IO error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Frame of {size} bytes exceeds limit of {limit} bytes")]
    FrameTooLarge { size: usize, limit: usize },

    #[error("Connection closed by peer")]
    PeerClosed,

    #[error("Protocol violation: {0}")]
    Protocol(String),

    #[error("Connection shut down locally")]
    LocalShutdown,

    #[error("Connect timed out after {0:?}")]
    ConnectTimeout(Duration),
}

impl From<std::io::Error> for ConnectionError {
    fn from(err: std::io::Error) -> Self {
        ConnectionError::Io(Arc::new(err))
    }
}

impl ConnectionError {
    /// Check if the remote side ended the connection
    pub fn is_peer_closed(&self) -> bool {
        matches!(self, ConnectionError::PeerClosed)
    }
}

/// Outcome error observed by a single caller
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Remote rejected command: {0}")]
    Application(#[from] ApplicationError),

    #[error("Connection failed: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Coordinator closed")]
    Closed,

    #[error("Command abandoned before a reply arrived")]
    Abandoned,
}

impl CommandError {
    /// Check if this error only concerns the one command
    ///
    /// Application errors leave the connection usable; everything else means
    /// the connection is gone.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CommandError::Application(_))
    }
}

/// A reply arrived while no command was outstanding
///
/// The pairing between requests and replies can no longer be trusted, so the
/// connection must be torn down.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Protocol desync: reply received with no outstanding command (after {dispatched} dispatched replies)")]
pub struct ProtocolDesync {
    /// Replies successfully paired before the desync was detected
    pub dispatched: u64,
}

impl From<ProtocolDesync> for ConnectionError {
    fn from(err: ProtocolDesync) -> Self {
        ConnectionError::Protocol(err.to_string())
    }
}

/// Errors that can occur while encoding a request
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Encoded command of {size} bytes exceeds limit of {limit} bytes")]
    TooLarge { size: usize, limit: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_converts() {
        let err: ConnectionError = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe gone").into();
        assert!(matches!(err, ConnectionError::Io(_)));
        assert!(err.to_string().contains("pipe gone"));
    }

    #[test]
    fn test_connection_error_clones_share_source() {
        let err: ConnectionError = std::io::Error::other("boom").into();
        let copy = err.clone();
        match (err, copy) {
            (ConnectionError::Io(a), ConnectionError::Io(b)) => assert!(Arc::ptr_eq(&a, &b)),
            _ => panic!("Wrong variant"),
        }
    }

    #[test]
    fn test_is_recoverable() {
        assert!(CommandError::Application(ApplicationError::new("WRONGTYPE")).is_recoverable());
        assert!(!CommandError::Connection(ConnectionError::PeerClosed).is_recoverable());
        assert!(!CommandError::Closed.is_recoverable());
        assert!(!CommandError::Abandoned.is_recoverable());
    }

    #[test]
    fn test_desync_becomes_protocol_error() {
        let err: ConnectionError = ProtocolDesync { dispatched: 7 }.into();
        match err {
            ConnectionError::Protocol(msg) => assert!(msg.contains("7 dispatched")),
            _ => panic!("Wrong variant"),
        }
    }

    #[test]
    fn test_frame_too_large_message() {
        let err = ConnectionError::FrameTooLarge { size: 2048, limit: 1024 };
        let msg = err.to_string();
        assert!(msg.contains("2048"));
        assert!(msg.contains("1024"));
    }
}
