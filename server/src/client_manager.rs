//! Connected-client records for the chess server
//!
//! This module handles the server-side bookkeeping of connected clients:
//! - Client lifecycle (registered on accept, removed on disconnect or failed write)
//! - Join priority assignment, strictly increasing in connection order
//! - Per-client game membership, colour and last finished position
//! - Outgoing line writes to the client's socket
//!
//! The table is capacity-bounded; once every slot is taken further
//! connections are refused until a client leaves.

use crate::game::GameId;
use crate::slots::{SlotId, Slots};
use log::info;
use shared::Colour;
use std::io;
use tokio::io::{AsyncWrite, AsyncWriteExt};

pub type ClientId = SlotId;

/// Write half of a client connection
pub type ClientWriter = Box<dyn AsyncWrite + Send + Sync + Unpin>;

/// Represents a connected client and their game membership
///
/// Each client maintains:
/// - Connection metadata (peer label, join priority)
/// - The game they are seated in, if any
/// - The final position of their last finished game, for `board`
pub struct Client {
    /// Peer description used in log lines
    pub label: String,
    /// Join order, lower means connected earlier
    pub priority: u64,
    /// Game currently being played
    pub game: Option<GameId>,
    /// Position the last game ended in; cleared when a new game starts
    pub last_game_fen: Option<String>,
    /// Requested colour while not playing, seated colour while playing
    pub colour: Option<Colour>,
    writer: ClientWriter,
}

impl Client {
    pub fn new(label: String, priority: u64, writer: ClientWriter) -> Self {
        Self {
            label,
            priority,
            game: None,
            last_game_fen: None,
            colour: None,
            writer,
        }
    }

    /// Writes and flushes `text` to the client
    pub async fn write(&mut self, text: &str) -> io::Result<()> {
        self.writer.write_all(text.as_bytes()).await?;
        self.writer.flush().await
    }
}

/// Manages all connected clients
///
/// Clients live in a fixed-capacity slot arena and are addressed by
/// generational handles, so a session that outlives its record (for example
/// after a failed write removed it) cannot touch a newer client that took
/// over the slot.
pub struct ClientManager {
    clients: Slots<Client>,
    /// Priority handed to the next connection
    next_priority: u64,
}

impl ClientManager {
    /// Creates a client manager with the given capacity limit.
    /// Priorities start from 1.
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: Slots::new(max_clients),
            next_priority: 1,
        }
    }

    /// Attempts to register a new connection
    ///
    /// Returns None if the server is at capacity. A refused connection does
    /// not consume a priority.
    pub fn add_client(&mut self, label: String, writer: ClientWriter) -> Option<ClientId> {
        let priority = self.next_priority;
        let client_id = self
            .clients
            .allocate(Client::new(label.clone(), priority, writer))?;
        self.next_priority += 1;

        info!(
            "Client {} connected from {} (priority {})",
            client_id, label, priority
        );
        Some(client_id)
    }

    /// Removes a client, dropping its write half
    pub fn remove_client(&mut self, client_id: ClientId) -> Option<Client> {
        let client = self.clients.release(client_id)?;
        info!("Client {} ({}) disconnected", client_id, client.label);
        Some(client)
    }

    pub fn get(&self, client_id: ClientId) -> Option<&Client> {
        self.clients.get(client_id)
    }

    pub fn get_mut(&mut self, client_id: ClientId) -> Option<&mut Client> {
        self.clients.get_mut(client_id)
    }

    pub fn contains(&self, client_id: ClientId) -> bool {
        self.clients.contains(client_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ClientId, &Client)> {
        self.clients.iter()
    }

    /// Returns the number of currently connected clients
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
