//! Connection driver
//!
//! Wires one duplex byte stream to a coordinator actor:
//! - a **reader** task decoding replies and feeding them to the actor
//! - a **writer** task draining the actor's outbound queue to the socket
//! - the **actor** itself, the only place the pending queue is touched
//!
//! The reader and writer only hold weak senders, so the actor stops once the
//! last [`CoordinatorHandle`] is gone.

mod config;
mod reader;
mod writer;

pub use config::ConnectionConfig;

use eyre::Result;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span};
use uuid::Uuid;

use crate::codec::{Decoder, JsonLineCodec, WireReply};
use crate::command::Reply;
use crate::coordinator::{CoordinatorActor, CoordinatorConfig, CoordinatorHandle};
use crate::error::ConnectionError;
use crate::transport::ChannelSink;

/// A running pipelined connection
pub struct Connection<V> {
    id: Uuid,
    handle: CoordinatorHandle<V>,
    actor: JoinHandle<()>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl Connection<WireReply> {
    /// Connect over TCP and speak newline-delimited JSON
    pub async fn open(config: &ConnectionConfig, coordinator: &CoordinatorConfig) -> Result<Self, ConnectionError> {
        debug!(address = %config.address, "Connection::open: called");
        let timeout = config.connect_timeout();
        let stream = tokio::time::timeout(timeout, TcpStream::connect(&config.address))
            .await
            .map_err(|_| ConnectionError::ConnectTimeout(timeout))??;
        stream.set_nodelay(true)?;

        info!(address = %config.address, "Connected");
        Ok(Self::spawn(
            stream,
            JsonLineCodec::new(config.max_frame_size),
            config,
            coordinator,
        ))
    }
}

impl<V: Reply> Connection<V> {
    /// Drive an already established stream
    pub fn spawn<T, D>(io: T, decoder: D, config: &ConnectionConfig, coordinator: &CoordinatorConfig) -> Self
    where
        T: AsyncRead + AsyncWrite + Send + 'static,
        D: Decoder<Value = V>,
    {
        let id = Uuid::now_v7();
        let span = info_span!("connection", conn_id = %id);

        let (read_half, write_half) = tokio::io::split(io);
        let (sink, queue) = ChannelSink::new(coordinator.write_high_water_mark);
        let closed = sink.close_signal();

        let actor = CoordinatorActor::new(sink, coordinator);
        let handle = actor.handle();
        let weak = actor.sender().downgrade();

        let reader = tokio::spawn(
            reader::run(read_half, decoder, config.read_buffer_size, weak.clone(), closed).instrument(span.clone()),
        );
        let writer = tokio::spawn(writer::run(write_half, queue, weak).instrument(span.clone()));
        let actor = tokio::spawn(actor.run().instrument(span));

        debug!(conn_id = %id, "Connection::spawn: tasks started");
        Self {
            id,
            handle,
            actor,
            reader,
            writer,
        }
    }

    /// Unique id of this connection, as used in log spans
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Get a handle for submitting commands
    pub fn handle(&self) -> CoordinatorHandle<V> {
        self.handle.clone()
    }

    /// Shut the connection down and wait for its tasks
    ///
    /// Commands still pending fail with [`ConnectionError::LocalShutdown`].
    pub async fn close(self) -> Result<()> {
        debug!(conn_id = %self.id, "Connection::close: called");
        // The actor may already be gone after a transport error
        let _ = self.handle.shutdown().await;
        drop(self.handle);

        self.actor.await?;
        self.writer.await?;
        self.reader.await?;
        info!(conn_id = %self.id, "Connection closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Encoder;
    use crate::error::CommandError;
    use serde_json::json;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    #[tokio::test]
    async fn test_spawn_over_duplex() {
        let (remote, local) = tokio::io::duplex(1024);
        let conn = Connection::spawn(
            local,
            JsonLineCodec::default(),
            &ConnectionConfig::default(),
            &CoordinatorConfig::default(),
        );
        let handle = conn.handle();

        // Echo each request line back as an Ok reply
        let peer = tokio::spawn(async move {
            let (read, mut write) = tokio::io::split(remote);
            let mut lines = BufReader::new(read).lines();
            while let Some(line) = lines.next_line().await.unwrap() {
                let value: serde_json::Value = serde_json::from_str(&line).unwrap();
                let reply = serde_json::to_string(&WireReply::ok(value)).unwrap();
                write.write_all(reply.as_bytes()).await.unwrap();
                write.write_all(b"\n").await.unwrap();
            }
        });

        let codec = JsonLineCodec::default();
        let first = handle.submit(codec.encode(&json!("a")).unwrap()).await.unwrap();
        let second = handle.submit(codec.encode(&json!("b")).unwrap()).await.unwrap();
        assert_eq!(first.reply.await.unwrap(), WireReply::ok(json!("a")));
        assert_eq!(second.reply.await.unwrap(), WireReply::ok(json!("b")));

        conn.close().await.unwrap();
        peer.await.unwrap();
        assert!(matches!(handle.call(codec.encode(&json!("c")).unwrap()).await, Err(CommandError::Closed)));
    }

    #[tokio::test]
    async fn test_open_refused() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        let config = ConnectionConfig::default().with_address(address);
        let result = Connection::open(&config, &CoordinatorConfig::default()).await;
        assert!(matches!(result, Err(ConnectionError::Io(_))));
    }
}
