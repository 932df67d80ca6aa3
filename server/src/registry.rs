//! Authoritative position registry for connected clients
//!
//! The registry is the single source of truth for every participant's
//! position. It handles:
//! - Identity allocation on connect (never reused while the process lives)
//! - Removal on disconnect, for whatever reason the connection ended
//! - Applying move commands to the sender's own position
//! - Point-in-time snapshots for the broadcast scheduler
//!
//! All access goes through a single exclusive lock ([`SharedRegistry`]), so
//! registration, removal, moves and snapshots never interleave partially.

use log::{debug, info};
use shared::{Identity, MoveCommand, Position, START_POSITION};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Updates queued for one connection before it counts as stalled
pub const OUTBOUND_CAPACITY: usize = 16;

/// Sink for encoded lines destined to one connection
pub type Outbound = mpsc::Sender<String>;

/// The registry behind the one lock every task shares
pub type SharedRegistry = Arc<Mutex<Registry>>;

/// A registered connection and its authoritative position
#[derive(Debug)]
pub struct Client {
    /// Identity assigned by the server at registration
    pub id: Identity,
    /// Peer address, kept for logging
    pub addr: SocketAddr,
    pub position: Position,
    outbound: Outbound,
}

impl Client {
    pub fn new(id: Identity, addr: SocketAddr, outbound: Outbound) -> Self {
        Self {
            id,
            addr,
            position: START_POSITION,
            outbound,
        }
    }
}

/// Owned copy of the registry taken at one instant
///
/// Holds no reference into the registry, so it stays valid after the lock is
/// released.
#[derive(Debug, Clone, Default)]
pub struct ServerSnapshot {
    /// Position of every identity registered at snapshot time
    pub positions: HashMap<Identity, Position>,
    /// Outbound sink of every identity in `positions`
    pub recipients: Vec<(Identity, Outbound)>,
}

/// Connected clients indexed by identity
#[derive(Debug)]
pub struct Registry {
    clients: HashMap<Identity, Client>,
    /// Counter behind the next identity handed out
    next_client_id: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
        }
    }

    /// Wraps a fresh registry in the shared lock
    pub fn shared() -> SharedRegistry {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Registers a new connection at the starting position
    ///
    /// Always succeeds and returns an identity that has never been handed out
    /// before. The new entry is visible to the next snapshot.
    pub fn register(&mut self, addr: SocketAddr, outbound: Outbound) -> Identity {
        let id = format!("id{}", self.next_client_id);
        self.next_client_id += 1;

        info!("Client {} connected from {}", id, addr);
        self.clients
            .insert(id.clone(), Client::new(id.clone(), addr, outbound));

        id
    }

    /// Removes a connection
    ///
    /// Returns true if the identity was registered. Removing an identity that
    /// is already gone is a no-op.
    pub fn deregister(&mut self, id: &str) -> bool {
        if let Some(client) = self.clients.remove(id) {
            info!(
                "Client {} ({}) disconnected at position {}",
                client.id, client.addr, client.position
            );
            true
        } else {
            false
        }
    }

    /// Shifts a registered client's position by one step
    ///
    /// Returns the new position, or None when the identity is not registered.
    /// A move racing with its connection's removal is dropped here and never
    /// brings the identity back.
    pub fn apply_move(&mut self, id: &str, command: MoveCommand) -> Option<Position> {
        let client = self.clients.get_mut(id)?;
        client.position = command.apply(client.position);
        debug!("Client {} moved {:?} to {}", id, command, client.position);
        Some(client.position)
    }

    /// Copies the current positions together with each connection's sink
    pub fn snapshot(&self) -> ServerSnapshot {
        let mut snapshot = ServerSnapshot {
            positions: HashMap::with_capacity(self.clients.len()),
            recipients: Vec::with_capacity(self.clients.len()),
        };

        for (id, client) in &self.clients {
            snapshot.positions.insert(id.clone(), client.position);
            snapshot
                .recipients
                .push((id.clone(), client.outbound.clone()));
        }

        snapshot
    }

    pub fn position(&self, id: &str) -> Option<Position> {
        self.clients.get(id).map(|client| client.position)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.clients.contains_key(id)
    }

    /// Returns the number of currently registered clients
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
