//! Reader task: socket bytes in, decoded replies out

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::codec::Decoder;
use crate::coordinator::CoordRequest;
use crate::error::ConnectionError;

/// Forward a request to the actor; false once the actor is gone
pub(super) async fn deliver<V>(tx: &mpsc::WeakSender<CoordRequest<V>>, req: CoordRequest<V>) -> bool {
    match tx.upgrade() {
        Some(tx) => tx.send(req).await.is_ok(),
        None => false,
    }
}

/// Read until EOF, an error, or a local close
///
/// Replies go to the actor strictly in the order they were decoded. At most
/// one transport error is reported, after which the task ends.
pub(super) async fn run<R, D>(
    mut io: R,
    mut decoder: D,
    read_buffer_size: usize,
    tx: mpsc::WeakSender<CoordRequest<D::Value>>,
    mut closed: watch::Receiver<bool>,
) where
    R: AsyncRead + Unpin,
    D: Decoder,
{
    debug!(read_buffer_size, "reader: started");
    let mut buf = Vec::with_capacity(read_buffer_size);
    let mut chunk = vec![0u8; read_buffer_size.max(1)];

    let err = loop {
        match decoder.decode(&mut buf) {
            Ok(Some(value)) => {
                if !deliver(&tx, CoordRequest::Inbound(value)).await {
                    debug!("reader: coordinator gone, stopping");
                    return;
                }
                continue;
            }
            Ok(None) => {}
            Err(e) => break e,
        }

        tokio::select! {
            biased;

            _ = async { closed.wait_for(|closed| *closed).await.is_ok() } => {
                debug!("reader: connection closed locally, stopping");
                return;
            }

            read = io.read(&mut chunk) => match read {
                Ok(0) => break ConnectionError::PeerClosed,
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
                Err(e) => break e.into(),
            },
        }
    };

    if err.is_peer_closed() {
        debug!("reader: peer closed the connection");
    } else {
        warn!(error = %err, "reader: connection failed");
    }
    deliver(&tx, CoordRequest::TransportError(err)).await;
}
