//! Newline-delimited JSON codec
//!
//! Each request is a single line of JSON followed by `\n`. Each reply is a
//! single line holding a tagged object:
//!
//! ```text
//! {"type":"Ok","value":...}
//! {"type":"Error","message":"..."}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::command::{ApplicationError, Command, Reply};
use crate::error::{ConnectionError, EncodeError};

use super::{Decoder, Encoder};

/// Default maximum frame size (1MB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024 * 1024;

/// A reply line as sent by the remote peer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WireReply {
    /// Normal result
    Ok { value: Value },

    /// The peer rejected the command
    Error { message: String },
}

impl WireReply {
    pub fn ok(value: Value) -> Self {
        WireReply::Ok { value }
    }

    pub fn error(message: impl Into<String>) -> Self {
        WireReply::Error {
            message: message.into(),
        }
    }

    /// The carried value, if this is a normal result
    pub fn into_value(self) -> Option<Value> {
        match self {
            WireReply::Ok { value } => Some(value),
            WireReply::Error { .. } => None,
        }
    }
}

impl Reply for WireReply {
    fn application_error(&self) -> Option<ApplicationError> {
        match self {
            WireReply::Ok { .. } => None,
            WireReply::Error { message } => Some(ApplicationError::new(message.clone())),
        }
    }
}

/// JSON-over-newline codec
#[derive(Debug, Clone)]
pub struct JsonLineCodec {
    max_frame_size: usize,
}

impl Default for JsonLineCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}

impl JsonLineCodec {
    pub fn new(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl Encoder for JsonLineCodec {
    type Item = Value;

    fn encode(&self, item: &Value) -> Result<Command, EncodeError> {
        // Compact JSON escapes newlines inside strings, so one value is one line
        let mut bytes = serde_json::to_vec(item)?;
        bytes.push(b'\n');

        if bytes.len() > self.max_frame_size {
            return Err(EncodeError::TooLarge {
                size: bytes.len(),
                limit: self.max_frame_size,
            });
        }
        Ok(Command::new(bytes))
    }
}

impl Decoder for JsonLineCodec {
    type Value = WireReply;

    fn decode(&mut self, buf: &mut Vec<u8>) -> Result<Option<WireReply>, ConnectionError> {
        loop {
            let Some(pos) = buf.iter().position(|&b| b == b'\n') else {
                if buf.len() > self.max_frame_size {
                    return Err(ConnectionError::FrameTooLarge {
                        size: buf.len(),
                        limit: self.max_frame_size,
                    });
                }
                return Ok(None);
            };

            if pos > self.max_frame_size {
                return Err(ConnectionError::FrameTooLarge {
                    size: pos,
                    limit: self.max_frame_size,
                });
            }

            let line: Vec<u8> = buf.drain(..=pos).collect();
            let line = line.trim_ascii();
            if line.is_empty() {
                // Blank keep-alive lines carry no reply
                continue;
            }

            let reply: WireReply =
                serde_json::from_slice(line).map_err(|e| ConnectionError::Decode(e.to_string()))?;
            debug!(len = line.len(), "JsonLineCodec::decode: decoded reply");
            return Ok(Some(reply));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_is_one_line() {
        let codec = JsonLineCodec::default();
        let cmd = codec.encode(&json!({"text": "two\nlines"})).unwrap();
        let bytes = cmd.as_bytes();
        assert_eq!(bytes.iter().filter(|&&b| b == b'\n').count(), 1);
        assert_eq!(bytes.last(), Some(&b'\n'));
    }

    #[test]
    fn test_encode_too_large() {
        let codec = JsonLineCodec::new(8);
        let err = codec.encode(&json!("this does not fit")).unwrap_err();
        assert!(matches!(err, EncodeError::TooLarge { limit: 8, .. }));
    }

    #[test]
    fn test_reply_serialize() {
        let json = serde_json::to_string(&WireReply::ok(json!(1))).unwrap();
        assert_eq!(json, r#"{"type":"Ok","value":1}"#);

        let json = serde_json::to_string(&WireReply::error("nope")).unwrap();
        assert_eq!(json, r#"{"type":"Error","message":"nope"}"#);
    }

    #[test]
    fn test_decode_waits_for_full_line() {
        let mut codec = JsonLineCodec::default();
        let mut buf = br#"{"type":"Ok","va"#.to_vec();
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"lue\":\"hi\"}\n");
        let reply = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(reply, WireReply::ok(json!("hi")));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_several_frames_in_order() {
        let mut codec = JsonLineCodec::default();
        let mut buf = b"{\"type\":\"Ok\",\"value\":1}\r\n\n{\"type\":\"Error\",\"message\":\"bad\"}\n{\"ty".to_vec();

        assert_eq!(codec.decode(&mut buf).unwrap(), Some(WireReply::ok(json!(1))));
        let second = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(second.application_error(), Some(ApplicationError::new("bad")));
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert_eq!(buf, b"{\"ty".to_vec());
    }

    #[test]
    fn test_decode_garbage_is_connection_error() {
        let mut codec = JsonLineCodec::default();
        let mut buf = b"not json\n".to_vec();
        assert!(matches!(codec.decode(&mut buf), Err(ConnectionError::Decode(_))));
    }

    #[test]
    fn test_decode_oversized_frame() {
        let mut codec = JsonLineCodec::new(16);
        let mut buf = vec![b'x'; 17];
        assert!(matches!(
            codec.decode(&mut buf),
            Err(ConnectionError::FrameTooLarge { size: 17, limit: 16 })
        ));
    }

    #[test]
    fn test_into_value() {
        assert_eq!(WireReply::ok(json!([1, 2])).into_value(), Some(json!([1, 2])));
        assert_eq!(WireReply::error("x").into_value(), None);
    }
}
