//! Server network layer handling TCP connections and the broadcast task

use crate::broadcast::Broadcaster;
use crate::registry::{Registry, SharedRegistry, OUTBOUND_CAPACITY};
use log::{debug, error, info, warn};
use shared::{
    decode, Identity, Message, MessageTag, ProtocolError, BROADCASTS_PER_SECOND, DEFAULT_PORT,
};
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::sleep;

/// Back-off before accepting again after a failed accept
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Interface to bind to
    pub host: String,
    pub port: u16,
    /// Snapshots broadcast per second
    pub broadcast_rate: u32,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            broadcast_rate: BROADCASTS_PER_SECOND,
        }
    }
}

/// Server errors
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("broadcast rate must be at least 1Hz")]
    InvalidBroadcastRate,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer sent something that is not a valid message
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolError),

    /// The peer sent a valid message that only the server may send
    #[error("unexpected {0} message from client")]
    UnexpectedMessage(MessageTag),
}

/// Authoritative server accepting clients and broadcasting their positions
pub struct Server {
    listener: TcpListener,
    registry: SharedRegistry,
    config: ServerConfig,
}

impl Server {
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        if config.broadcast_rate == 0 {
            return Err(ServerError::InvalidBroadcastRate);
        }

        let addr = config.address();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        info!("Server listening on {}", listener.local_addr()?);

        Ok(Server {
            listener,
            registry: Registry::shared(),
            config,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Handle to the registry, shared with every connection task
    pub fn registry(&self) -> SharedRegistry {
        SharedRegistry::clone(&self.registry)
    }

    /// Accepts connections and broadcasts state until the future is dropped
    pub async fn run(self) -> Result<(), ServerError> {
        let broadcaster = Broadcaster::new(self.registry(), self.config.broadcast_rate);

        tokio::select! {
            _ = broadcaster.run() => {
                error!("Broadcast task stopped");
            }
            _ = self.accept_loop() => {}
        }

        Ok(())
    }

    async fn accept_loop(&self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    tokio::spawn(handle_connection(stream, addr, self.registry()));
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    sleep(ACCEPT_RETRY_DELAY).await;
                }
            }
        }
    }
}

/// Serves one client from registration to removal
pub async fn handle_connection(stream: TcpStream, addr: SocketAddr, registry: SharedRegistry) {
    let (outbound, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
    let id = registry.lock().await.register(addr, outbound);

    let session = run_session(
        stream,
        id.clone(),
        outbound_rx,
        SharedRegistry::clone(&registry),
    );
    supervise_session(id, registry, session).await;
}

/// Runs `session` in its own task and deregisters `id` once it ends
///
/// Whether the session returns cleanly, fails on a protocol violation or
/// panics, the identity is removed before this function returns.
pub async fn supervise_session<F>(id: Identity, registry: SharedRegistry, session: F)
where
    F: Future<Output = Result<(), ServerError>> + Send + 'static,
{
    match tokio::spawn(session).await {
        Ok(Ok(())) => debug!("Connection {} closed", id),
        Ok(Err(e)) => warn!("Closing connection {}: {}", id, e),
        Err(e) => error!("Session task for {} failed: {}", id, e),
    }

    registry.lock().await.deregister(&id);
}

/// Reads move commands and writes queued snapshots until either side ends
async fn run_session(
    stream: TcpStream,
    id: String,
    mut outbound_rx: mpsc::Receiver<String>,
    registry: SharedRegistry,
) -> Result<(), ServerError> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    let read_loop = async {
        while let Some(line) = lines.next_line().await? {
            handle_line(&line, &id, &registry).await?;
        }
        Ok::<(), ServerError>(())
    };

    // Ends when the registry drops this connection's sink
    let write_loop = async {
        while let Some(line) = outbound_rx.recv().await {
            writer.write_all(line.as_bytes()).await?;
        }
        Ok::<(), ServerError>(())
    };

    tokio::select! {
        result = read_loop => result,
        result = write_loop => result,
    }
}

/// Decodes one line from a client and applies it
async fn handle_line(line: &str, id: &str, registry: &SharedRegistry) -> Result<(), ServerError> {
    match decode(line)? {
        Message::Move(command) => {
            let applied = registry.lock().await.apply_move(id, command);
            if applied.is_none() {
                debug!("Ignoring {:?} from unregistered client {}", command, id);
            }
        }
        Message::MouseClick(_) => {
            debug!("Ignoring mouse input from {}", id);
        }
        Message::StateUpdate(_) => {
            return Err(ServerError::UnexpectedMessage(MessageTag::StateUpdate));
        }
    }
    Ok(())
}
