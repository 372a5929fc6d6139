//! # Chess Server Library
//!
//! This library provides the server for networked turn-based chess. Clients
//! connect over TCP and speak a line protocol; the server pairs them into
//! games against each other or against the computer, referees every move,
//! and relays moves and results between the players.
//!
//! ## Core Responsibilities
//!
//! ### Refereeing
//! The server holds the authoritative position of every game as a position
//! encoding. It never evaluates chess rules itself: legality, check,
//! checkmate and stalemate are all decided by asking an external engine
//! about the stored position.
//!
//! ### Client Management
//! Handles the complete lifecycle of client connections including:
//! - Registration with a strictly increasing join priority
//! - Command parsing and validation against game and turn state
//! - Disconnection handling, which resigns any game in progress
//!
//! ### Matchmaking
//! Clients asking for a human opponent are paired by colour compatibility,
//! earliest join first, or wait until a compatible client arrives.
//!
//! ## Architecture Design
//!
//! ### One Task per Connection
//! Each accepted connection runs its own session task. Sessions read lines
//! without holding any lock, then take the single state lock for the whole
//! command, so commands from different clients are applied one at a time.
//!
//! ### Single Engine
//! One engine subprocess serves every game. Each query is a complete
//! exchange made under the state lock, so queries never interleave. If the
//! engine fails or answers out of sync, the server shuts it down and exits.
//!
//! ## Module Organization
//!
//! ### Client Manager Module (`client_manager`)
//! Connected-client records: join priority, game membership, colour,
//! last finished position and the write half of the connection.
//!
//! ### Engine Module (`engine`)
//! The [`engine::Engine`] trait and its UCI implementation over a child
//! process.
//!
//! ### Game Module (`game`)
//! Game records and the move pipeline shared by human and computer moves.
//!
//! ### Matchmaking Module (`matchmaking`)
//! The waiting list and colour resolution for human pairings.
//!
//! ### Network and Session Modules (`network`, `session`)
//! The accept loop and the per-connection command loop.
//!
//! ### State Module (`state`)
//! The shared resource table behind the state lock.

pub mod client_manager;
pub mod config;
pub mod engine;
pub mod error;
pub mod game;
pub mod matchmaking;
pub mod network;
pub mod session;
pub mod slots;
pub mod state;

pub use config::ServerConfig;
pub use engine::{Engine, EngineError, UciEngine};
pub use error::ServerError;
pub use network::Server;
pub use state::{ServerState, SharedState};
