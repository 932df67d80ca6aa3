//! # Position Sync Server Library
//!
//! This library provides the authoritative server for the position-sync
//! protocol. It owns the canonical position of every connected participant,
//! applies their move commands, and periodically pushes each of them a
//! personalized snapshot of the world.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative State
//! The server holds the single source of truth: one position per connected
//! client. Clients never send positions, only move commands, and whatever the
//! server broadcasts overrides anything a client predicted locally.
//!
//! ### Client Lifecycle
//! - Every accepted connection is registered under a fresh identity
//! - Moves are applied in the order each connection sends them
//! - Any ending of a connection (clean close, I/O error, protocol violation,
//!   even a panic in its task) removes it from the registry
//!
//! ### State Broadcasting
//! At a fixed cadence (5Hz by default) the server copies the registry and
//! sends every client its own position plus everybody else's.
//!
//! ## Architecture Design
//!
//! ### One Task per Connection
//! Each connection is served by its own tokio task which reads newline
//! delimited JSON messages and writes queued snapshots. A slow or stalled
//! peer only ever blocks its own task.
//!
//! ### Single Lock
//! The registry is the only shared mutable state and sits behind one
//! exclusive lock. Registration, removal, moves and snapshots are each a
//! single short critical section; no network I/O happens while it is held.
//!
//! ### Isolated Failures
//! A malformed message closes only the connection that sent it. A failed
//! send removes only that recipient. Neither affects the broadcast task or
//! any other client.
//!
//! ## Module Organization
//!
//! ### Registry Module (`registry`)
//! Identity allocation, position bookkeeping and snapshots.
//!
//! ### Broadcast Module (`broadcast`)
//! Personalization of snapshots and the fixed-cadence broadcast task.
//!
//! ### Network Module (`network`)
//! TCP accept loop, per-connection sessions and server configuration.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::bind(ServerConfig::default()).await?;
//!
//!     // Accepts clients and broadcasts at 5Hz until the process exits
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod broadcast;
pub mod network;
pub mod registry;
