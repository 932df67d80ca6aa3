//! Client side of the TCP connection
//!
//! One task reads snapshots from the server into the [`SnapshotBuffer`],
//! another writes queued move commands. The render loop only talks to the
//! buffer and to [`Connection::send_move`], so it never blocks on the socket.

use crate::buffer::SnapshotBuffer;
use log::{error, info, warn};
use shared::{decode_state_update, encode_line, Message, MoveCommand};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

pub struct Connection {
    outbound: mpsc::UnboundedSender<MoveCommand>,
    connected: Arc<AtomicBool>,
}

impl Connection {
    /// Connects to `server_addr` and starts the reader and writer tasks
    ///
    /// Must be called from within a tokio runtime.
    pub async fn open(server_addr: &str, buffer: SnapshotBuffer) -> std::io::Result<Self> {
        info!("Connecting to server...");
        let stream = TcpStream::connect(server_addr).await?;
        info!("Connected to {} from {}", stream.peer_addr()?, stream.local_addr()?);

        let (reader, writer) = stream.into_split();
        let connected = Arc::new(AtomicBool::new(true));
        let (outbound, outbound_rx) = mpsc::unbounded_channel();

        tokio::spawn(receive_updates(reader, buffer, Arc::clone(&connected)));
        tokio::spawn(send_moves(writer, outbound_rx, Arc::clone(&connected)));

        Ok(Connection {
            outbound,
            connected,
        })
    }

    /// Queues a move for the server, returns false once the connection is gone
    pub fn send_move(&self, command: MoveCommand) -> bool {
        self.is_connected() && self.outbound.send(command).is_ok()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

/// Pushes every state update into `buffer` until the stream ends or misbehaves
pub async fn receive_updates<R>(reader: R, buffer: SnapshotBuffer, connected: Arc<AtomicBool>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match decode_state_update(&line) {
                Ok(state) => buffer.push(state),
                Err(e) => {
                    warn!("Bad update from server: {}", e);
                    break;
                }
            },
            Ok(None) => {
                info!("Server closed the connection");
                break;
            }
            Err(e) => {
                error!("Error receiving update: {}", e);
                break;
            }
        }
    }

    connected.store(false, Ordering::SeqCst);
}

/// Writes queued move commands, one line each, until the queue or stream closes
pub async fn send_moves<W>(
    mut writer: W,
    mut commands: mpsc::UnboundedReceiver<MoveCommand>,
    connected: Arc<AtomicBool>,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(command) = commands.recv().await {
        let line = match encode_line(&Message::Move(command)) {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to encode {:?}: {}", command, e);
                continue;
            }
        };

        if let Err(e) = writer.write_all(line.as_bytes()).await {
            error!("Error sending move: {}", e);
            break;
        }
    }

    connected.store(false, Ordering::SeqCst);
}
