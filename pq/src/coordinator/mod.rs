//! Coordinator for pipelined command/response connections
//!
//! The Coordinator pairs each inbound reply with the oldest outstanding
//! command on one connection:
//! - **Submit:** enqueue a completion and write the command, in one step
//! - **Inbound:** resolve the oldest completion with the reply
//! - **Transport error:** fail every pending completion and close
//!
//! [`Coordinator`] is the synchronous state machine. [`CoordinatorActor`]
//! gives it a single-task serialization domain on tokio, and
//! [`CoordinatorHandle`] is what callers hold.

mod actor;
mod config;
mod core;
mod handle;
mod messages;
mod pending;

pub use actor::CoordinatorActor;
pub use config::CoordinatorConfig;
pub use self::core::{Coordinator, CoordinatorState};
pub use handle::{CoordinatorHandle, Submitted};
pub use messages::CoordRequest;
pub use pending::{PendingEntry, PendingQueue};
