//! Wire codecs
//!
//! The coordinator only sees [`Command`] bytes going out and decoded
//! [`Reply`] values coming in. Codecs sit at that boundary: the reader task
//! runs a [`Decoder`] over the bytes it reads, callers run an [`Encoder`]
//! before submitting.

mod json_line;

pub use json_line::{JsonLineCodec, WireReply};

use crate::command::{Command, Reply};
use crate::error::{ConnectionError, EncodeError};

/// Turns caller-level requests into command bytes
pub trait Encoder {
    type Item: ?Sized;

    fn encode(&self, item: &Self::Item) -> Result<Command, EncodeError>;
}

/// Pulls complete reply values out of a read buffer
pub trait Decoder: Send + 'static {
    type Value: Reply;

    /// Decode one value from the front of `buf`, consuming its bytes
    ///
    /// Returns `Ok(None)` when `buf` does not hold a complete frame yet. Any
    /// error is fatal for the connection.
    fn decode(&mut self, buf: &mut Vec<u8>) -> Result<Option<Self::Value>, ConnectionError>;
}
