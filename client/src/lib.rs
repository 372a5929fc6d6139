//! # Chess Client Library
//!
//! This library provides a terminal client for the chess server. It connects
//! over TCP, asks for a game on startup, prints what the server says and
//! turns typed commands into protocol requests.
//!
//! ## Architecture Overview
//!
//! The server is authoritative for everything: the client never checks chess
//! rules. It only tracks enough state to refuse obviously pointless commands
//! before they reach the wire:
//! - whether a game is in progress (`started` until `gameover`)
//! - whose turn it is (flipped by `ok` for our moves and `moved` for theirs)
//!
//! Typed input is read on its own task and handed to the session loop over
//! a channel, so server lines are shown as soon as they arrive even while
//! the user is typing.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! The locally tracked game state.
//!
//! ### Input Module (`input`)
//! Typed commands (`newgame`, `print`, `hint`, `possible`, `move`, `resign`,
//! `quit`), their local validation and the messages shown when a command is
//! refused.
//!
//! ### Network Module (`network`)
//! Connecting to the server and the session loop.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::{connect, spawn_input_reader, Client};
//! use shared::{ClientCommand, Opponent};
//! use tokio::io::BufReader;
//!
//! # async fn example() -> Result<(), client::network::ClientError> {
//! let stream = connect("4000").await?;
//! let (reader, writer) = stream.into_split();
//! let start = ClientCommand::Start { opponent: Opponent::Human, colour: None };
//! let input = spawn_input_reader(BufReader::new(tokio::io::stdin()));
//! let client = Client::new(writer, tokio::io::stdout(), tokio::io::stderr(), start);
//! let exit = client.run(BufReader::new(reader), input).await;
//! # let _ = exit;
//! # Ok(())
//! # }
//! ```

pub mod game;
pub mod input;
pub mod network;

/// Bad command-line arguments
pub const INVALID_ARGS_EXIT_CODE: i32 = 13;
/// The server could not be reached
pub const CANT_CONNECT_EXIT_CODE: i32 = 11;
/// The server closed the connection
pub const SERVER_GONE_EXIT_CODE: i32 = 8;
