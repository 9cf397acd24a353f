//! Command payloads and reply values
//!
//! The coordinator never looks inside a command. The only thing it needs to
//! know about a reply is whether the remote side rejected the command.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An encoded request, ready to be written to the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    payload: Vec<u8>,
}

impl Command {
    /// Wrap an already encoded payload
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    /// Raw bytes to put on the wire
    pub fn as_bytes(&self) -> &[u8] {
        &self.payload
    }

    /// Payload size in bytes
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Take the payload out of the command
    pub fn into_bytes(self) -> Vec<u8> {
        self.payload
    }
}

impl From<Vec<u8>> for Command {
    fn from(payload: Vec<u8>) -> Self {
        Self::new(payload)
    }
}

impl From<&str> for Command {
    fn from(payload: &str) -> Self {
        Self::new(payload.as_bytes())
    }
}

/// Remote-side rejection of one specific command
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ApplicationError {
    pub message: String,
}

impl ApplicationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A decoded inbound value
///
/// Implemented by whatever value type the codec produces.
pub trait Reply: Send + 'static {
    /// The rejection carried by this value, if the remote refused the command
    fn application_error(&self) -> Option<ApplicationError>;
}

impl Reply for String {
    fn application_error(&self) -> Option<ApplicationError> {
        None
    }
}

impl<T: Send + 'static> Reply for Result<T, ApplicationError> {
    fn application_error(&self) -> Option<ApplicationError> {
        self.as_ref().err().cloned()
    }
}
