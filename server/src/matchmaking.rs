//! Pairing of clients who asked for a human opponent
//!
//! Waiting clients are kept ordered by join priority. A new request is paired
//! with the earliest waiting client whose colour preference is compatible;
//! if none is, the requester joins the waiting list.

use crate::client_manager::ClientId;
use crate::engine::Engine;
use crate::game::Game;
use crate::state::ServerState;
use log::{info, warn};
use shared::{preference_name, Colour, ProtocolError, ServerMessage};
use std::collections::BTreeMap;

/// Clients waiting for a human opponent, ordered by join priority
#[derive(Debug, Default)]
pub struct WaitingList {
    queue: BTreeMap<u64, ClientId>,
}

impl WaitingList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, priority: u64, client_id: ClientId) {
        self.remove(client_id);
        self.queue.insert(priority, client_id);
    }

    /// Returns whether the client was waiting
    pub fn remove(&mut self, client_id: ClientId) -> bool {
        let before = self.queue.len();
        self.queue.retain(|_, waiting| *waiting != client_id);
        before != self.queue.len()
    }

    pub fn contains(&self, client_id: ClientId) -> bool {
        self.queue.values().any(|waiting| *waiting == client_id)
    }

    /// Waiting clients, earliest join first
    pub fn iter(&self) -> impl Iterator<Item = ClientId> + '_ {
        self.queue.values().copied()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// A matchmaking request: join priority and colour preference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seeker {
    pub priority: u64,
    pub colour: Option<Colour>,
}

/// Two preferences can share a game unless both want the same colour
pub fn colours_compatible(a: Option<Colour>, b: Option<Colour>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a != b,
        _ => true,
    }
}

/// Colours for a compatible pair, as `(requester, other)`.
///
/// A concrete preference wins, the requester's first. When neither side
/// cares, whoever joined the server earlier plays white.
pub fn resolve_colours(requester: Seeker, other: Seeker) -> (Colour, Colour) {
    let mine = match (requester.colour, other.colour) {
        (Some(colour), _) => colour,
        (None, Some(colour)) => colour.opposite(),
        (None, None) if requester.priority < other.priority => Colour::White,
        (None, None) => Colour::Black,
    };
    (mine, mine.opposite())
}

impl<E: Engine> ServerState<E> {
    fn seeker(&self, client_id: ClientId) -> Option<Seeker> {
        self.clients.get(client_id).map(|client| Seeker {
            priority: client.priority,
            colour: client.colour,
        })
    }

    /// Earliest waiting client compatible with `requester`
    pub fn find_opponent(&self, requester: ClientId) -> Option<ClientId> {
        let wanted = self.seeker(requester)?.colour;
        self.waiting
            .iter()
            .filter(|waiting| *waiting != requester)
            .find(|waiting| {
                self.seeker(*waiting)
                    .is_some_and(|other| colours_compatible(wanted, other.colour))
            })
    }

    /// Pairs `requester` with a waiting client or queues it.
    ///
    /// The requester's colour preference must already be recorded on its
    /// client record. On a match both players get `started`, white first.
    pub(crate) async fn match_or_wait(&mut self, requester: ClientId) -> Result<(), ProtocolError> {
        let Some(me) = self.seeker(requester) else {
            return Ok(());
        };

        let Some((opponent, other)) = self
            .find_opponent(requester)
            .and_then(|id| self.seeker(id).map(|seeker| (id, seeker)))
        else {
            info!(
                "Client {} waiting for an opponent (colour {})",
                requester,
                preference_name(me.colour)
            );
            self.waiting.push(me.priority, requester);
            return Ok(());
        };

        let (mine, _) = resolve_colours(me, other);
        let (white, black) = match mine {
            Colour::White => (requester, opponent),
            Colour::Black => (opponent, requester),
        };

        self.waiting.remove(opponent);
        self.waiting.remove(requester);
        let Some(game_id) = self.seat_game(Game::between(white, black)) else {
            warn!("Game table full, {} keeps waiting", opponent);
            self.waiting.push(other.priority, opponent);
            return Err(ProtocolError::Game);
        };

        for (player, colour) in [(white, Colour::White), (black, Colour::Black)] {
            if !self.games.contains(game_id) {
                break;
            }
            self.send(player, &ServerMessage::Started(colour)).await;
        }
        Ok(())
    }
}
