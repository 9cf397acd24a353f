//! Writer task: drains the outbound queue onto the socket

use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::command::Command;
use crate::coordinator::CoordRequest;
use crate::error::ConnectionError;
use crate::transport::OutboundQueue;

use super::reader::deliver;

/// Write frames in queue order until the sink closes or a write fails
///
/// Frames already waiting are batched into one flush. Once the sink closes,
/// nothing more is written.
pub(super) async fn run<W, V>(io: W, mut queue: OutboundQueue, tx: mpsc::WeakSender<CoordRequest<V>>)
where
    W: AsyncWrite + Unpin,
{
    debug!("writer: started");
    let mut io = BufWriter::new(io);

    while let Some(first) = queue.next().await {
        let mut batch = vec![first];
        while let Some(next) = queue.try_next() {
            batch.push(next);
        }

        if let Err(err) = write_batch(&mut io, &queue, batch).await {
            warn!(error = %err, "writer: write failed");
            // The actor sees the real error before the queue stops accepting frames
            deliver(&tx, CoordRequest::TransportError(err)).await;
            queue.close();
            return;
        }
    }

    debug!("writer: outbound queue closed, shutting down write half");
    if let Err(e) = io.shutdown().await {
        debug!(error = %e, "writer: shutdown failed");
    }
}

async fn write_batch<W>(io: &mut BufWriter<W>, queue: &OutboundQueue, batch: Vec<Command>) -> Result<(), ConnectionError>
where
    W: AsyncWrite + Unpin,
{
    let mut frames = 0usize;
    for command in batch {
        if queue.is_closing() {
            debug!(frames, "writer: connection closed mid-batch, dropping the rest");
            queue.written(command.len());
            continue;
        }
        io.write_all(command.as_bytes()).await?;
        queue.written(command.len());
        frames += 1;
    }
    io.flush().await?;
    debug!(frames, "writer: flushed batch");
    Ok(())
}
