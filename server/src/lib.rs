//! # Arcade Server Library
//!
//! This library provides the authoritative server for the multiplayer
//! "click the square" game. It owns the set of live targets, decides which
//! click claims a target, keeps scores, and pushes every change to all
//! connected players over WebSockets.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Game State
//! The server is the only place where targets are created and removed. A
//! click is validated purely geometrically against the live targets; the
//! first click strictly inside a target claims it and removes it in the same
//! step, so no target can ever be claimed twice.
//!
//! ### Session Management
//! Handles the complete lifecycle of player sessions:
//! - Registration and replay of the current board on connect
//! - Click routing and score bookkeeping
//! - Liveness probing and eviction of unresponsive peers
//! - Cleanup and head-count announcements on disconnect
//!
//! ### Broadcasting
//! Every state change is pushed as a compact binary event, so all players see
//! the same board right after each broadcast.
//!
//! ## Architecture Design
//!
//! ### Single-Owner Event Loop
//! All shared state lives in one [`session::Arcade`] owned by the event loop
//! in [`network::Server::run`]. Connection tasks only exchange messages with
//! it through channels, which removes the need for locks and keeps each
//! operation atomic.
//!
//! ### Per-Connection Tasks
//! Each WebSocket gets a reader task that forwards inbound frames and pongs to
//! the event loop, and a writer task that drains the session's outbound queue.
//!
//! ## Module Organization
//!
//! - `config`: command line and environment configuration
//! - `game`: live target store, spawning and hit testing
//! - `client_manager`: session registry and outbound queues
//! - `dispatch`: encoding and fan-out of events
//! - `liveness`: probe and eviction of idle sessions
//! - `spawner`: replacement spawn policy
//! - `session`: connect / click / disconnect handling
//! - `network`: TCP accept loop, WebSocket tasks and the event loop
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::Config;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let mut server = Server::bind(Config::default()).await?;
//!
//!     // Put the initial targets on the board before players arrive
//!     server.arcade_mut().seed();
//!
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod config;
pub mod dispatch;
pub mod game;
pub mod liveness;
pub mod network;
pub mod session;
pub mod spawner;
