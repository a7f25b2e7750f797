use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::RelayError;
use crate::transform::Transform;

pub const COPY_BUF_SIZE: usize = 32 * 1024;

/// Copy buffer sizing: 32 KiB, clamped down to a known remaining length
/// when the source provides one, never below a single byte.
pub fn buffer_size(remaining_hint: Option<u64>) -> usize {
    match remaining_hint {
        Some(n) if n < COPY_BUF_SIZE as u64 => n.max(1) as usize,
        _ => COPY_BUF_SIZE,
    }
}

/// Copies `src` to `dst` until EOF, applying the transform to exactly the
/// bytes read on each iteration. Returns the number of bytes written.
///
/// Writes have full-write semantics: backpressure from a healthy
/// destination is absorbed, and only a destination that stops accepting
/// bytes outright fails the direction (`WriteZero`). EOF on the source
/// ends the loop without error.
pub async fn copy_transformed<R, W>(
    src: &mut R,
    dst: &mut W,
    transform: Transform,
    remaining_hint: Option<u64>,
) -> Result<u64, RelayError>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buf = vec![0u8; buffer_size(remaining_hint)];
    let mut written: u64 = 0;

    loop {
        let nr = src.read(&mut buf).await?;
        if nr == 0 {
            break;
        }
        transform.apply(&mut buf[..nr]);
        dst.write_all(&buf[..nr]).await.map_err(|e| match e.kind() {
            io::ErrorKind::WriteZero => RelayError::WriteZero,
            _ => RelayError::Io(e),
        })?;
        written += nr as u64;
    }

    Ok(written)
}

/// One relay direction. Delegates to `tokio::io::copy` when the transform
/// is inactive; its completion or failure goes into the shared channel.
async fn relay<R, W>(
    mut src: R,
    mut dst: W,
    transform: Transform,
    direction: &'static str,
    done: mpsc::Sender<Result<u64, RelayError>>,
) where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let result = if transform.is_active() {
        copy_transformed(&mut src, &mut dst, transform, None).await
    } else {
        tokio::io::copy(&mut src, &mut dst)
            .await
            .map_err(RelayError::from)
    };

    match &result {
        Ok(bytes) => debug!(direction, bytes, "relay direction finished"),
        Err(e) => debug!(direction, "relay direction failed: {e}"),
    }

    // Channel capacity 2 holds both direction signals, so this send never
    // blocks even when the session handler has already returned.
    let _ = done.send(result).await;
}

/// Runs both relay directions until the first one finishes, then tears
/// the session down and reports that direction's outcome. The slower
/// direction is aborted rather than joined; dropping the stream halves
/// closes both sockets.
pub async fn run_session(
    client: TcpStream,
    remote: TcpStream,
    transform: Transform,
) -> Result<(), RelayError> {
    let (client_read, client_write) = client.into_split();
    let (remote_read, remote_write) = remote.into_split();
    let (done_tx, mut done_rx) = mpsc::channel(2);

    let upstream = tokio::spawn(relay(
        client_read,
        remote_write,
        transform,
        "client->remote",
        done_tx.clone(),
    ));
    let downstream = tokio::spawn(relay(
        remote_read,
        client_write,
        transform,
        "remote->client",
        done_tx,
    ));

    let result = done_rx.recv().await.unwrap_or(Ok(0));
    upstream.abort();
    downstream.abort();
    result.map(|_| ())
}
