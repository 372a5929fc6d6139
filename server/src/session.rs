//! Per-connection command handling
//!
//! A session reads one line at a time from its client without holding the
//! state lock, then takes the lock for the whole command. Protocol errors
//! go back to the client as `error <kind>`; an engine error ends the session
//! with the engine shut down, and the caller brings the server down.

use crate::client_manager::ClientId;
use crate::engine::{Engine, EngineError};
use crate::error::CommandError;
use crate::game::{Game, GameId, MoveOutcome};
use crate::state::{ServerState, SharedState};
use log::{debug, error, warn};
use shared::{ClientCommand, Colour, HintKind, Opponent, ProtocolError, ServerMessage};
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite};

/// Longest accepted command line, newline included
pub const MAX_LINE_LEN: u64 = 1024;

/// Serves one client until it disconnects.
///
/// Returns the engine error that ended the session, if any. By then the
/// engine has already been shut down.
pub async fn run_session<E, R, W>(
    state: SharedState<E>,
    mut reader: R,
    writer: W,
    label: String,
) -> Result<(), EngineError>
where
    E: Engine,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Send + Sync + Unpin + 'static,
{
    let client_id = state.lock().await.connect(label.clone(), Box::new(writer));
    let Some(client_id) = client_id else {
        warn!("Refusing {}: client table full", label);
        return Ok(());
    };

    let mut line = Vec::new();
    loop {
        line.clear();
        let read = (&mut reader)
            .take(MAX_LINE_LEN)
            .read_until(b'\n', &mut line)
            .await;
        match read {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("Read from {} failed: {}", label, e);
                break;
            }
        }

        // None marks a line that cannot be a command
        let command = if line.ends_with(b"\n") {
            std::str::from_utf8(&line)
                .ok()
                .and_then(shared::strip_newline)
        } else if line.len() as u64 == MAX_LINE_LEN {
            match discard_line(&mut reader).await {
                Ok(true) => None,
                Ok(false) => break,
                Err(e) => {
                    debug!("Read from {} failed: {}", label, e);
                    break;
                }
            }
        } else {
            // A final line without its newline is dropped
            break;
        };

        let mut guard = state.lock().await;
        if !guard.is_connected(client_id) {
            return Ok(());
        }
        let Some(text) = command else {
            debug!("Client {} sent an unreadable line", client_id);
            guard
                .send(client_id, &ServerMessage::Error(ProtocolError::Command))
                .await;
            continue;
        };
        if let Err(e) = guard.handle_line(client_id, text).await {
            error!("Engine failure while serving {}: {}", label, e);
            guard.shutdown_engine().await;
            return Err(e);
        }
    }

    state.lock().await.disconnect(client_id).await;
    Ok(())
}

/// Skips input up to and including the next newline.
///
/// Returns false if the input ends first.
async fn discard_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> io::Result<bool> {
    loop {
        let buf = reader.fill_buf().await?;
        if buf.is_empty() {
            return Ok(false);
        }
        match buf.iter().position(|byte| *byte == b'\n') {
            Some(end) => {
                reader.consume(end + 1);
                return Ok(true);
            }
            None => {
                let len = buf.len();
                reader.consume(len);
            }
        }
    }
}

impl<E: Engine> ServerState<E> {
    /// Handles one command line (newline removed) from `client_id`.
    ///
    /// Only engine failures are returned; everything else is answered on
    /// the client's connection.
    pub async fn handle_line(
        &mut self,
        client_id: ClientId,
        line: &str,
    ) -> Result<(), EngineError> {
        let outcome = match line.parse::<ClientCommand>() {
            Ok(command) => self.dispatch(client_id, command).await,
            Err(kind) => Err(kind.into()),
        };

        match outcome {
            Ok(()) => Ok(()),
            Err(CommandError::Protocol(kind)) => {
                debug!("Client {} sent `{}`: error {}", client_id, line, kind);
                self.send(client_id, &ServerMessage::Error(kind)).await;
                Ok(())
            }
            Err(CommandError::Engine(e)) => Err(e),
        }
    }

    async fn dispatch(
        &mut self,
        client_id: ClientId,
        command: ClientCommand,
    ) -> Result<(), CommandError> {
        match command {
            ClientCommand::Start { opponent, colour } => {
                self.handle_start(client_id, opponent, colour).await
            }
            ClientCommand::Board => self.handle_board(client_id).await,
            ClientCommand::Hint(kind) => self.handle_hint(client_id, kind).await,
            ClientCommand::Move(token) => self.handle_move(client_id, &token).await,
            ClientCommand::Resign => self.handle_resign(client_id).await,
        }
    }

    /// The game `client_id` is playing, provided it is their turn
    fn game_on_turn(&self, client_id: ClientId) -> Result<GameId, ProtocolError> {
        let client = self.clients.get(client_id).ok_or(ProtocolError::Game)?;
        let game_id = client.game.ok_or(ProtocolError::Game)?;
        let game = self.games.get(game_id).ok_or(ProtocolError::Game)?;
        if client.colour != Some(game.turn()) {
            return Err(ProtocolError::Turn);
        }
        Ok(game_id)
    }

    async fn handle_start(
        &mut self,
        client_id: ClientId,
        opponent: Opponent,
        colour: Option<Colour>,
    ) -> Result<(), CommandError> {
        let current = self.clients.get(client_id).and_then(|client| client.game);
        if let Some(game_id) = current {
            self.resign(client_id, game_id).await;
        }
        self.waiting.remove(client_id);

        // Resigning writes to this client, which may have dropped it
        let Some(client) = self.clients.get_mut(client_id) else {
            return Ok(());
        };
        client.colour = colour;
        client.last_game_fen = None;

        match opponent {
            Opponent::Computer => {
                let colour = colour.unwrap_or(Colour::White);
                let game_id = self
                    .seat_game(Game::against_computer(client_id, colour))
                    .ok_or(ProtocolError::Game)?;
                if self.send(client_id, &ServerMessage::Started(colour)).await {
                    self.continue_with_computer(game_id).await?;
                }
            }
            Opponent::Human => self.match_or_wait(client_id).await?,
        }
        Ok(())
    }

    async fn handle_board(&mut self, client_id: ClientId) -> Result<(), CommandError> {
        let client = self.clients.get(client_id).ok_or(ProtocolError::Game)?;
        let fen = match (&client.last_game_fen, client.game) {
            (Some(fen), _) => fen.clone(),
            (None, Some(game_id)) => self
                .games
                .get(game_id)
                .map(|game| game.fen().to_string())
                .ok_or(ProtocolError::Game)?,
            (None, None) => return Err(ProtocolError::Game.into()),
        };

        let report = self.engine.describe(&fen, None).await?;
        self.send(client_id, &ServerMessage::Board(report.board)).await;
        Ok(())
    }

    async fn handle_hint(
        &mut self,
        client_id: ClientId,
        kind: HintKind,
    ) -> Result<(), CommandError> {
        let game_id = self.game_on_turn(client_id)?;
        let fen = self
            .games
            .get(game_id)
            .map(|game| game.fen().to_string())
            .ok_or(ProtocolError::Game)?;

        let moves = match kind {
            HintKind::All => self.engine.legal_moves(&fen).await?,
            HintKind::Best => vec![self.engine.best_move(&fen).await?],
        };
        self.send(client_id, &ServerMessage::Moves(moves)).await;
        Ok(())
    }

    async fn handle_move(&mut self, client_id: ClientId, token: &str) -> Result<(), CommandError> {
        let game_id = self.game_on_turn(client_id)?;
        if self.play_move(game_id, token).await? == MoveOutcome::Accepted {
            self.continue_with_computer(game_id).await?;
        }
        Ok(())
    }

    async fn handle_resign(&mut self, client_id: ClientId) -> Result<(), CommandError> {
        let game_id = self
            .clients
            .get(client_id)
            .and_then(|client| client.game)
            .ok_or(ProtocolError::Game)?;
        self.resign(client_id, game_id).await;
        Ok(())
    }
}
