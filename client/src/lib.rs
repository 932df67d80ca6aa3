//! # Position Sync Client Library
//!
//! This library provides the client side of the position-sync protocol: it
//! connects to the authoritative server, sends move commands, and turns the
//! low-rate stream of server snapshots into smooth on-screen motion.
//!
//! ## Architecture Overview
//!
//! The server broadcasts only a handful of snapshots per second, so the client
//! combines two techniques to keep the display responsive and fluid:
//!
//! ### Client-Side Prediction
//! Each move command is applied to the local player immediately, without
//! waiting for the server. The next authoritative snapshot simply overwrites
//! the predicted position; there is no replay of unacknowledged moves.
//!
//! ### Interpolation
//! Remote players are moved continuously between snapshots. From the two
//! oldest buffered snapshots a per-player velocity is estimated and replayed
//! over the following interval. When that interval runs out, the oldest
//! snapshot is discarded and the next pair takes over.
//!
//! ## Module Organization
//!
//! ### Buffer Module (`buffer`)
//! Thread-safe FIFO between the network task and the render loop.
//!
//! ### Interpolation Module (`interpolation`)
//! Velocity estimation and position queries over a pair of snapshots.
//!
//! ### Game Module (`game`)
//! The displayed state and the state machine that walks the snapshot queue.
//!
//! ### Input Module (`input`)
//! Keyboard sampling, movement commands and view toggles.
//!
//! ### Network Module (`network`)
//! TCP connection with separate reader and writer tasks.
//!
//! ### Rendering Module (`rendering`)
//! Players and status indicators drawn with macroquad.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::buffer::SnapshotBuffer;
//! use client::game::ClientGame;
//! use client::network::Connection;
//! use shared::MoveCommand;
//! use std::time::Instant;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let buffer = SnapshotBuffer::new();
//!     let connection = Connection::open("127.0.0.1:8080", buffer.clone()).await?;
//!     let mut game = ClientGame::new();
//!
//!     loop {
//!         // Send the move and show it right away
//!         if connection.send_move(MoveCommand::MoveRight) {
//!             game.predict(MoveCommand::MoveRight);
//!         }
//!
//!         // Pick up whatever arrived since the last frame
//!         game.receive(buffer.drain());
//!         game.update(Instant::now());
//!
//!         println!("{:?}", game.state());
//!         tokio::time::sleep(std::time::Duration::from_millis(16)).await;
//!     }
//! }
//! ```

pub mod buffer;
pub mod game;
pub mod input;
pub mod interpolation;
pub mod network;
pub mod rendering;
