//! pipeq - Pipelined command/response coordinator
//!
//! pipeq lets a caller send many commands over one ordered, bidirectional
//! connection without waiting for each reply, and still hands every reply to
//! the caller that sent the matching command.
//!
//! # Core Concepts
//!
//! - **FIFO Pairing**: The Nth reply belongs to the Nth unanswered command
//! - **One Serialization Domain**: Submit, dispatch and drain never interleave
//! - **All-or-Nothing Failure**: A connection error fails every pending command, once
//! - **Local Rejections**: A remote error reply fails only its own command
//!
//! # Modules
//!
//! - [`coordinator`] - Pairing state machine, actor and handle
//! - [`completion`] - Resolve-once completion slots
//! - [`transport`] - Outbound sink trait and tokio channel sink
//! - [`connection`] - TCP driver (reader/writer tasks)
//! - [`codec`] - Newline-delimited JSON codec
//! - [`peer`] - Loopback peer for `pq serve` and tests
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod codec;
pub mod command;
pub mod completion;
pub mod config;
pub mod connection;
pub mod coordinator;
pub mod error;
pub mod metrics;
pub mod peer;
pub mod transport;

// Re-export commonly used types
pub use codec::{Decoder, Encoder, JsonLineCodec, WireReply};
pub use command::{ApplicationError, Command, Reply};
pub use completion::{Completion, Outcome, ReplyFuture};
pub use config::Config;
pub use connection::{Connection, ConnectionConfig};
pub use coordinator::{
    CoordRequest, Coordinator, CoordinatorActor, CoordinatorConfig, CoordinatorHandle, CoordinatorState, Submitted,
};
pub use error::{CommandError, ConnectionError, EncodeError, ProtocolDesync};
pub use metrics::{CoordinatorMetrics, MetricsSnapshot, NoopObserver, Observer};
pub use transport::{ChannelSink, OutboundSink, WriteStatus};
