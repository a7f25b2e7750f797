use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{ProxyError, Result};
use crate::transform::Transform;

pub mod header;
pub mod relay;

use header::{extract_host, is_tunnel, read_header};

const CONNECT_ESTABLISHED: &[u8] = b"HTTP/1.1 200 Connection Established\r\n\r\n";

/// Owns the listening socket and spawns one task per accepted client.
pub struct ProxyServer {
    listener: TcpListener,
    config: Arc<Config>,
}

impl ProxyServer {
    /// Binds the listen socket. Failure here is fatal for the process;
    /// every other error stays contained to a single connection.
    pub async fn bind(config: Arc<Config>) -> Result<Self> {
        let listener = TcpListener::bind(config.listen_addr()).await?;
        Ok(Self { listener, config })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub async fn run(self) -> Result<()> {
        info!("listening on {}", self.listener.local_addr()?);
        loop {
            let (client, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("accept error: {e}");
                    continue;
                }
            };
            debug!("accepted connection from {peer}");

            let config = self.config.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_client(client, config).await {
                    warn!(client = %peer, "connection failed: {e}");
                }
            });
        }
    }
}

/// Per-connection pipeline: header acquisition, destination resolution,
/// remote dial, CONNECT acknowledgment, then the bidirectional relay.
/// Both connections are dropped on every exit path.
async fn handle_client(mut client: TcpStream, config: Arc<Config>) -> Result<()> {
    let transform = Transform::new(config.transform);
    let mut tunnel = false;
    let mut header = None;

    let destination = match &config.next_hop {
        Some(next_hop) => next_hop.clone(),
        None => {
            let bytes = read_header(&mut client, transform)
                .await
                .map_err(ProxyError::HeaderRead)?;
            if bytes.is_empty() {
                return Err(ProxyError::HeaderRead(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed before any request bytes",
                )));
            }
            debug!(header = %String::from_utf8_lossy(&bytes), "received request header");

            tunnel = is_tunnel(&bytes);
            if tunnel {
                debug!("received CONNECT request");
            }
            let address =
                extract_host(tunnel, &bytes).ok_or(ProxyError::UnresolvableDestination)?;
            debug!(%address, "resolved destination");
            header = Some(bytes);
            address
        }
    };

    let mut remote = TcpStream::connect(&destination)
        .await
        .map_err(ProxyError::Dial)?;

    if tunnel {
        // The tunnel carries its own traffic once acknowledged; nothing
        // from the CONNECT request is forwarded to the remote.
        let mut response = CONNECT_ESTABLISHED.to_vec();
        transform.apply(&mut response);
        client.write_all(&response).await?;
    } else if let Some(mut bytes) = header.take() {
        // Reading the header consumed it from the client irreversibly, so
        // replay it to the remote before relaying.
        transform.apply(&mut bytes);
        remote.write_all(&bytes).await?;
    }

    relay::run_session(client, remote, transform).await?;
    Ok(())
}
