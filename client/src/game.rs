use log::debug;
use shared::{Colour, ServerMessage};

/// What the client knows about its current game, learned only from server
/// messages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientGameState {
    pub in_progress: bool,
    pub colour: Option<Colour>,
    pub my_turn: bool,
}

impl ClientGameState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates the state from one server message.
    ///
    /// `ok` confirms our move and `moved` reports the opponent's, so both
    /// hand the turn over.
    pub fn observe(&mut self, message: &ServerMessage) {
        match message {
            ServerMessage::Started(colour) => {
                self.in_progress = true;
                self.colour = Some(*colour);
                self.my_turn = *colour == Colour::White;
            }
            ServerMessage::Ok | ServerMessage::Moved(_) => {
                self.my_turn = !self.my_turn;
            }
            ServerMessage::GameOver { .. } => {
                self.in_progress = false;
            }
            _ => {}
        }
        debug!("Game state now {:?}", self);
    }
}
