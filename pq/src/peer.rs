//! Loopback peer
//!
//! A minimal remote end for the JSON-line protocol, used by `pq serve` and
//! the tests. It answers every request line with exactly one reply line, in
//! order: objects carrying a string `"fail"` field are rejected with that
//! message, anything else is echoed back.

use eyre::{Context, Result};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::codec::WireReply;

/// Build the reply for one request line
pub fn respond(line: &str) -> WireReply {
    let value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => return WireReply::error(format!("invalid JSON: {}", e)),
    };

    if let Some(message) = value.get("fail").and_then(Value::as_str) {
        return WireReply::error(message);
    }
    WireReply::ok(value)
}

/// Accept connections forever, one task per client
pub async fn serve(listener: TcpListener) -> Result<()> {
    let local = listener.local_addr().context("Failed to read listener address")?;
    info!(%local, "Peer listening");

    loop {
        let (stream, remote) = listener.accept().await.context("Failed to accept connection")?;
        debug!(%remote, "Peer: client connected");
        tokio::spawn(async move {
            match handle_client(stream).await {
                Ok(answered) => debug!(%remote, answered, "Peer: client disconnected"),
                Err(e) => warn!(%remote, error = %e, "Peer: client failed"),
            }
        });
    }
}

/// Answer request lines until the client closes its side
///
/// Returns the number of replies sent.
pub async fn handle_client<S>(stream: S) -> Result<u64>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (read, mut write) = tokio::io::split(stream);
    let mut lines = BufReader::new(read).lines();
    let mut answered = 0u64;

    while let Some(line) = lines.next_line().await.context("Failed to read request")? {
        if line.trim().is_empty() {
            continue;
        }

        let reply = serde_json::to_string(&respond(&line)).context("Failed to serialize reply")?;
        write.write_all(reply.as_bytes()).await.context("Failed to write reply")?;
        write.write_all(b"\n").await.context("Failed to write newline")?;
        answered += 1;
    }

    write.flush().await.context("Failed to flush replies")?;
    Ok(answered)
}
