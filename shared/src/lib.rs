//! Wire vocabulary shared by the chess server and the terminal client.
//!
//! Every message on the client/server connection is a single line of
//! space-separated ASCII tokens terminated by `\n`. The only exception is the
//! board rendering, which is framed by `startboard` / `endboard` lines.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Shortest accepted move token (`e2e4`)
pub const MIN_MOVE_LEN: usize = 4;
/// Longest accepted move token (`e7e8q`)
pub const MAX_MOVE_LEN: usize = 5;

/// Standard starting position, side to move and castling rights included
pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Side of the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Colour {
    White,
    Black,
}

impl Colour {
    pub fn opposite(self) -> Self {
        match self {
            Colour::White => Colour::Black,
            Colour::Black => Colour::White,
        }
    }

    /// Player slot index within a game: white is 0, black is 1
    pub fn index(self) -> usize {
        match self {
            Colour::White => 0,
            Colour::Black => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Colour::White => "white",
            Colour::Black => "black",
        }
    }
}

impl fmt::Display for Colour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Colour {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "white" => Ok(Colour::White),
            "black" => Ok(Colour::Black),
            _ => Err(ProtocolError::Command),
        }
    }
}

/// Parses a colour request where `either` means no preference
pub fn parse_colour_preference(s: &str) -> Result<Option<Colour>, ProtocolError> {
    match s {
        "either" => Ok(None),
        other => other.parse().map(Some),
    }
}

/// Wire name of a colour request
pub fn preference_name(colour: Option<Colour>) -> &'static str {
    colour.map_or("either", Colour::as_str)
}

/// Who the requester wants to play against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opponent {
    Computer,
    Human,
}

impl fmt::Display for Opponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opponent::Computer => f.write_str("computer"),
            Opponent::Human => f.write_str("human"),
        }
    }
}

impl FromStr for Opponent {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "computer" => Ok(Opponent::Computer),
            "human" => Ok(Opponent::Human),
            _ => Err(ProtocolError::Command),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HintKind {
    /// Every legal move in the current position
    All,
    /// The engine's preferred move
    Best,
}

/// Error kinds reported back to a client as `error <kind>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Malformed line, unknown command or bad argument
    #[error("command")]
    Command,
    /// Well-formed command but no applicable game
    #[error("game")]
    Game,
    /// Well-formed command during the opponent's turn
    #[error("turn")]
    Turn,
    /// Well-formed move token the engine refused to play
    #[error("move")]
    Move,
}

impl FromStr for ProtocolError {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "command" => Ok(ProtocolError::Command),
            "game" => Ok(ProtocolError::Game),
            "turn" => Ok(ProtocolError::Turn),
            "move" => Ok(ProtocolError::Move),
            _ => Err(ProtocolError::Command),
        }
    }
}

/// Removes the terminating newline; `None` when the line was cut short by EOF
pub fn strip_newline(line: &str) -> Option<&str> {
    line.strip_suffix('\n')
}

/// Splits a line (newline already removed) into its space-separated tokens.
///
/// The line must be non-empty and may neither start nor end with a space.
/// Tokens are separated by exactly one space, so an empty token anywhere
/// rejects the whole line.
pub fn split_line(line: &str) -> Option<Vec<&str>> {
    if line.is_empty() || line.starts_with(' ') || line.ends_with(' ') {
        return None;
    }
    let tokens: Vec<&str> = line.split(' ').collect();
    if tokens.iter().any(|token| token.is_empty()) {
        return None;
    }
    Some(tokens)
}

/// A move token is 4-5 ASCII alphanumeric characters
pub fn is_valid_move(token: &str) -> bool {
    (MIN_MOVE_LEN..=MAX_MOVE_LEN).contains(&token.len())
        && token.chars().all(|c| c.is_ascii_alphanumeric())
}

/// A command sent by a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    Start {
        opponent: Opponent,
        colour: Option<Colour>,
    },
    Move(String),
    Hint(HintKind),
    Board,
    Resign,
}

impl FromStr for ClientCommand {
    type Err = ProtocolError;

    /// Parses a line without its newline. Only shape and content are
    /// checked here; game and turn errors depend on server state.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let tokens = split_line(line).ok_or(ProtocolError::Command)?;
        match tokens.as_slice() {
            ["board"] => Ok(ClientCommand::Board),
            ["resign"] => Ok(ClientCommand::Resign),
            ["move", token] if is_valid_move(token) => Ok(ClientCommand::Move(token.to_string())),
            ["hint", "all"] => Ok(ClientCommand::Hint(HintKind::All)),
            ["hint", "best"] => Ok(ClientCommand::Hint(HintKind::Best)),
            ["start", opponent, colour] => Ok(ClientCommand::Start {
                opponent: opponent.parse()?,
                colour: parse_colour_preference(colour)?,
            }),
            _ => Err(ProtocolError::Command),
        }
    }
}

impl fmt::Display for ClientCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientCommand::Start { opponent, colour } => {
                write!(f, "start {} {}", opponent, preference_name(*colour))
            }
            ClientCommand::Move(token) => write!(f, "move {}", token),
            ClientCommand::Hint(HintKind::All) => f.write_str("hint all"),
            ClientCommand::Hint(HintKind::Best) => f.write_str("hint best"),
            ClientCommand::Board => f.write_str("board"),
            ClientCommand::Resign => f.write_str("resign"),
        }
    }
}

/// How a game finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameResult {
    Resignation,
    Checkmate,
    Stalemate,
}

impl fmt::Display for GameResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameResult::Resignation => f.write_str("resignation"),
            GameResult::Checkmate => f.write_str("checkmate"),
            GameResult::Stalemate => f.write_str("stalemate"),
        }
    }
}

impl FromStr for GameResult {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "resignation" => Ok(GameResult::Resignation),
            "checkmate" => Ok(GameResult::Checkmate),
            "stalemate" => Ok(GameResult::Stalemate),
            _ => Err(ProtocolError::Command),
        }
    }
}

/// A message sent by the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    Started(Colour),
    Ok,
    Moved(String),
    Check,
    Error(ProtocolError),
    GameOver {
        result: GameResult,
        winner: Option<Colour>,
    },
    /// Engine board diagram; every line already ends with `\n`
    Board(String),
    Moves(Vec<String>),
}

impl ServerMessage {
    /// Full wire form including the terminating newline
    pub fn to_wire(&self) -> String {
        format!("{}\n", self)
    }

    /// Parses a single server line (newline removed). Board framing lines
    /// and diagram rows are not messages on their own and yield `None`.
    pub fn parse_line(line: &str) -> Option<Self> {
        let tokens = split_line(line)?;
        match tokens.as_slice() {
            ["ok"] => Some(ServerMessage::Ok),
            ["check"] => Some(ServerMessage::Check),
            ["started", colour] => colour.parse().ok().map(ServerMessage::Started),
            ["moved", token] => Some(ServerMessage::Moved(token.to_string())),
            ["error", kind] => kind.parse().ok().map(ServerMessage::Error),
            ["gameover", result] => Some(ServerMessage::GameOver {
                result: result.parse().ok()?,
                winner: None,
            }),
            ["gameover", result, winner] => Some(ServerMessage::GameOver {
                result: result.parse().ok()?,
                winner: Some(winner.parse().ok()?),
            }),
            ["moves", moves @ ..] => Some(ServerMessage::Moves(
                moves.iter().map(|m| m.to_string()).collect(),
            )),
            _ => None,
        }
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::Started(colour) => write!(f, "started {}", colour),
            ServerMessage::Ok => f.write_str("ok"),
            ServerMessage::Moved(token) => write!(f, "moved {}", token),
            ServerMessage::Check => f.write_str("check"),
            ServerMessage::Error(kind) => write!(f, "error {}", kind),
            ServerMessage::GameOver { result, winner } => match winner {
                Some(colour) => write!(f, "gameover {} {}", result, colour),
                None => write!(f, "gameover {}", result),
            },
            ServerMessage::Board(diagram) => write!(f, "startboard\n{}endboard", diagram),
            ServerMessage::Moves(moves) => {
                f.write_str("moves")?;
                for token in moves {
                    write!(f, " {}", token)?;
                }
                Ok(())
            }
        }
    }
}
