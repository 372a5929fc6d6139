//! The shared resource table: every client, every game, the waiting list and
//! the engine, guarded by a single lock.
//!
//! Sessions take the lock for a whole command, engine round trips included,
//! so commands from different clients never interleave.

use crate::client_manager::{ClientId, ClientManager, ClientWriter};
use crate::config::ServerConfig;
use crate::engine::Engine;
use crate::game::Game;
use crate::matchmaking::WaitingList;
use crate::slots::Slots;
use log::warn;
use shared::ServerMessage;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Handle shared by every session task
pub type SharedState<E> = Arc<Mutex<ServerState<E>>>;

pub struct ServerState<E> {
    pub(crate) clients: ClientManager,
    pub(crate) games: Slots<Game>,
    pub(crate) waiting: WaitingList,
    pub(crate) engine: E,
}

impl<E: Engine> ServerState<E> {
    pub fn new(engine: E, max_clients: usize, max_games: usize) -> Self {
        Self {
            clients: ClientManager::new(max_clients),
            games: Slots::new(max_games),
            waiting: WaitingList::new(),
            engine,
        }
    }

    pub fn from_config(engine: E, config: &ServerConfig) -> Self {
        Self::new(engine, config.max_clients, config.max_games)
    }

    pub fn into_shared(self) -> SharedState<E> {
        Arc::new(Mutex::new(self))
    }

    /// Registers a new connection; None when the client table is full
    pub fn connect(&mut self, label: String, writer: ClientWriter) -> Option<ClientId> {
        self.clients.add_client(label, writer)
    }

    /// Removes a client for good.
    ///
    /// A game in progress is resigned on the client's behalf, so the
    /// opponent wins by resignation.
    pub async fn disconnect(&mut self, client_id: ClientId) {
        self.waiting.remove(client_id);
        let game = self.clients.get(client_id).and_then(|client| client.game);
        if let Some(game_id) = game {
            self.resign(client_id, game_id).await;
        }
        self.clients.remove_client(client_id);
    }

    pub fn is_connected(&self, client_id: ClientId) -> bool {
        self.clients.contains(client_id)
    }

    /// Sends one message line to a client.
    ///
    /// A failed write disconnects the client. Returns whether the line was
    /// delivered.
    pub(crate) async fn send(&mut self, client_id: ClientId, message: &ServerMessage) -> bool {
        let Some(client) = self.clients.get_mut(client_id) else {
            return false;
        };
        let delivered = client.write(&message.to_wire()).await;
        match delivered {
            Ok(()) => true,
            Err(e) => {
                warn!("Write to client {} failed: {}", client_id, e);
                self.disconnect(client_id).await;
                false
            }
        }
    }

    pub fn clients(&self) -> &ClientManager {
        &self.clients
    }

    pub fn games(&self) -> &Slots<Game> {
        &self.games
    }

    pub fn waiting(&self) -> &WaitingList {
        &self.waiting
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Terminates the engine after a fatal failure
    pub async fn shutdown_engine(&mut self) {
        self.engine.shutdown().await;
    }
}
