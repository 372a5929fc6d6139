//! Terminal command parsing and local validation

use crate::game::ClientGameState;
use shared::{ClientCommand, HintKind};
use std::str::FromStr;
use thiserror::Error;

/// A command typed by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    NewGame,
    Print,
    Hint,
    Possible,
    Move(String),
    Resign,
    Quit,
}

/// Why a typed command was not sent; the message is shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Try again - command is not valid")]
    NotValid,
    #[error("Invalid command - game not in progress")]
    NotInProgress,
    #[error("Invalid command - not your turn")]
    NotYourTurn,
}

impl FromStr for UserCommand {
    type Err = InputError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let tokens = shared::split_line(line).ok_or(InputError::NotValid)?;
        match tokens.as_slice() {
            ["newgame"] => Ok(UserCommand::NewGame),
            ["print"] => Ok(UserCommand::Print),
            ["hint"] => Ok(UserCommand::Hint),
            ["possible"] => Ok(UserCommand::Possible),
            ["resign"] => Ok(UserCommand::Resign),
            ["quit"] => Ok(UserCommand::Quit),
            ["move", token] if shared::is_valid_move(token) => {
                Ok(UserCommand::Move(token.to_string()))
            }
            _ => Err(InputError::NotValid),
        }
    }
}

/// What the client should do with a typed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Send(ClientCommand),
    Quit,
}

impl UserCommand {
    /// Checks the command against the local game state and turns it into
    /// the request to send. `start` is what `newgame` asks for.
    pub fn into_action(
        self,
        game: &ClientGameState,
        start: &ClientCommand,
    ) -> Result<Action, InputError> {
        let command = match self {
            UserCommand::NewGame => start.clone(),
            UserCommand::Print => {
                require_in_progress(game)?;
                ClientCommand::Board
            }
            UserCommand::Hint => {
                require_turn(game)?;
                ClientCommand::Hint(HintKind::Best)
            }
            UserCommand::Possible => {
                require_turn(game)?;
                ClientCommand::Hint(HintKind::All)
            }
            UserCommand::Move(token) => {
                require_turn(game)?;
                ClientCommand::Move(token)
            }
            UserCommand::Resign => {
                require_in_progress(game)?;
                ClientCommand::Resign
            }
            UserCommand::Quit => return Ok(Action::Quit),
        };
        Ok(Action::Send(command))
    }
}

fn require_in_progress(game: &ClientGameState) -> Result<(), InputError> {
    if game.in_progress {
        Ok(())
    } else {
        Err(InputError::NotInProgress)
    }
}

fn require_turn(game: &ClientGameState) -> Result<(), InputError> {
    require_in_progress(game)?;
    if game.my_turn {
        Ok(())
    } else {
        Err(InputError::NotYourTurn)
    }
}

/// Parses and validates one typed line (newline removed)
pub fn interpret(
    line: &str,
    game: &ClientGameState,
    start: &ClientCommand,
) -> Result<Action, InputError> {
    line.parse::<UserCommand>()?.into_action(game, start)
}
