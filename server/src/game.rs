//! Games and the move pipeline
//!
//! A game seats one or two human clients; an empty seat is played by the
//! engine. Every move, human or computer, goes through [`ServerState::play_move`]:
//! the engine is asked to apply it, an unchanged position means the move was
//! illegal, and a changed one is accepted and followed by a mate/stalemate/check
//! probe of the new position.

use crate::client_manager::ClientId;
use crate::engine::{Engine, EngineError};
use crate::slots::SlotId;
use crate::state::ServerState;
use log::{debug, info, warn};
use shared::{Colour, GameResult, ProtocolError, ServerMessage, STARTING_FEN};

pub type GameId = SlotId;

/// Result of running one move through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The engine refused the move; nothing changed
    Rejected,
    /// The move was played and the game continues
    Accepted,
    /// The game is no longer running (mate, stalemate, or a player dropped)
    GameOver,
}

/// A game in progress
///
/// Seats are indexed by [`Colour::index`]. The constructors guarantee that at
/// least one seat holds a human.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    players: [Option<ClientId>; 2],
    turn: Colour,
    fen: String,
}

impl Game {
    /// Human in the `colour` seat, engine in the other
    pub fn against_computer(human: ClientId, colour: Colour) -> Self {
        let mut players = [None, None];
        players[colour.index()] = Some(human);
        Self::seated(players)
    }

    pub fn between(white: ClientId, black: ClientId) -> Self {
        Self::seated([Some(white), Some(black)])
    }

    fn seated(players: [Option<ClientId>; 2]) -> Self {
        Self {
            players,
            turn: Colour::White,
            fen: STARTING_FEN.to_string(),
        }
    }

    /// Starts from `fen` instead of the standard position; the side to move
    /// is taken from the encoding.
    pub fn from_position(mut self, fen: impl Into<String>) -> Self {
        self.fen = fen.into();
        self.turn = side_to_move(&self.fen);
        self
    }

    /// Client in the `colour` seat, None for the engine
    pub fn player(&self, colour: Colour) -> Option<ClientId> {
        self.players[colour.index()]
    }

    pub fn players(&self) -> [Option<ClientId>; 2] {
        self.players
    }

    pub fn colour_of(&self, client_id: ClientId) -> Option<Colour> {
        [Colour::White, Colour::Black]
            .into_iter()
            .find(|colour| self.player(*colour) == Some(client_id))
    }

    pub fn is_against_computer(&self) -> bool {
        self.players.iter().any(Option::is_none)
    }

    pub fn turn(&self) -> Colour {
        self.turn
    }

    pub fn fen(&self) -> &str {
        &self.fen
    }

    /// Records an accepted move: new position, other side to move
    fn advance(&mut self, fen: String) {
        self.fen = fen;
        self.turn = self.turn.opposite();
    }
}

/// Side to move according to a position encoding
pub fn side_to_move(fen: &str) -> Colour {
    match fen.split_whitespace().nth(1) {
        Some("b") => Colour::Black,
        _ => Colour::White,
    }
}

impl<E: Engine> ServerState<E> {
    /// Allocates `game` and seats its players.
    ///
    /// Seated clients take the seat's colour and forget their previous
    /// game's final position. Returns None when the game table is full.
    pub fn seat_game(&mut self, game: Game) -> Option<GameId> {
        let players = game.players();
        let game_id = self.games.allocate(game)?;

        for colour in [Colour::White, Colour::Black] {
            let Some(player) = players[colour.index()] else {
                continue;
            };
            if let Some(client) = self.clients.get_mut(player) {
                client.game = Some(game_id);
                client.colour = Some(colour);
                client.last_game_fen = None;
            }
        }

        info!(
            "Game {} started: white {}, black {}",
            game_id,
            seat_name(players[0]),
            seat_name(players[1])
        );
        Some(game_id)
    }

    /// Ends a game and frees its slot.
    ///
    /// Every human player keeps the final position and is told the result.
    /// A player whose connection fails here is simply dropped; the game is
    /// already over.
    pub(crate) async fn end_game(
        &mut self,
        game_id: GameId,
        result: GameResult,
        winner: Option<Colour>,
    ) {
        let Some(game) = self.games.release(game_id) else {
            return;
        };
        info!(
            "Game {} over: {} ({})",
            game_id,
            result,
            winner.map_or("no winner", Colour::as_str)
        );

        let message = ServerMessage::GameOver { result, winner }.to_wire();
        for player in game.players.into_iter().flatten() {
            let Some(client) = self.clients.get_mut(player) else {
                continue;
            };
            client.last_game_fen = Some(game.fen.clone());
            client.game = None;

            let delivered = client.write(&message).await;
            if let Err(e) = delivered {
                warn!("Could not deliver game result to {}: {}", player, e);
                self.waiting.remove(player);
                self.clients.remove_client(player);
            }
        }
    }

    /// `client_id` gives up `game_id`; the other side wins
    pub(crate) async fn resign(&mut self, client_id: ClientId, game_id: GameId) {
        let Some(colour) = self
            .games
            .get(game_id)
            .and_then(|game| game.colour_of(client_id))
        else {
            return;
        };
        self.end_game(game_id, GameResult::Resignation, Some(colour.opposite()))
            .await;
    }

    /// Runs `token` through the engine for the side to move in `game_id`.
    ///
    /// Rejection is reported to the mover only. On acceptance the mover gets
    /// `ok`, the opponent `moved <token>`, then the new position is probed:
    /// no legal replies ends the game (checkmate if in check, else
    /// stalemate), otherwise a check is announced to both players.
    pub(crate) async fn play_move(
        &mut self,
        game_id: GameId,
        token: &str,
    ) -> Result<MoveOutcome, EngineError> {
        let Some(game) = self.games.get(game_id) else {
            return Ok(MoveOutcome::GameOver);
        };
        let fen = game.fen().to_string();
        let mover_colour = game.turn();
        let players = game.players();
        let mover = players[mover_colour.index()];
        let opponent = players[mover_colour.opposite().index()];

        let report = self.engine.describe(&fen, Some(token)).await?;
        if report.fen == fen {
            debug!("Game {}: {} move {} rejected", game_id, mover_colour, token);
            if let Some(mover) = mover {
                self.send(mover, &ServerMessage::Error(ProtocolError::Move))
                    .await;
            }
            return Ok(MoveOutcome::Rejected);
        }

        if let Some(game) = self.games.get_mut(game_id) {
            game.advance(report.fen.clone());
        }
        debug!("Game {}: {} played {}", game_id, mover_colour, token);

        if let Some(mover) = mover {
            if !self.send(mover, &ServerMessage::Ok).await {
                return Ok(MoveOutcome::GameOver);
            }
        }
        if let Some(opponent) = opponent {
            if !self
                .send(opponent, &ServerMessage::Moved(token.to_string()))
                .await
            {
                return Ok(MoveOutcome::GameOver);
            }
        }

        let replies = self.engine.legal_moves(&report.fen).await?;
        if replies.is_empty() {
            if report.in_check() {
                self.end_game(game_id, GameResult::Checkmate, Some(mover_colour))
                    .await;
            } else {
                self.end_game(game_id, GameResult::Stalemate, None).await;
            }
            return Ok(MoveOutcome::GameOver);
        }

        if report.in_check() {
            for player in players.into_iter().flatten() {
                self.send(player, &ServerMessage::Check).await;
                if !self.games.contains(game_id) {
                    return Ok(MoveOutcome::GameOver);
                }
            }
        }

        Ok(MoveOutcome::Accepted)
    }

    /// Plays the engine's move if the side to move in `game_id` has no
    /// human seated. Runs at most one move: afterwards a human is to move.
    pub(crate) async fn continue_with_computer(
        &mut self,
        game_id: GameId,
    ) -> Result<(), EngineError> {
        let Some(game) = self.games.get(game_id) else {
            return Ok(());
        };
        if game.player(game.turn()).is_some() {
            return Ok(());
        }
        let fen = game.fen().to_string();

        let best = self.engine.best_move(&fen).await?;
        if self.play_move(game_id, &best).await? == MoveOutcome::Rejected {
            warn!("Game {}: engine's own move {} was rejected", game_id, best);
        }
        Ok(())
    }
}

fn seat_name(player: Option<ClientId>) -> String {
    player.map_or_else(|| "computer".to_string(), |id| id.to_string())
}
