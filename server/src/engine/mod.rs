//! Bridge to the external move-generation engine
//!
//! The server never evaluates chess rules itself. Every question about a
//! position (is this move legal, what does the board look like, how many
//! replies exist, what would the engine play) is answered by one engine
//! behind the [`Engine`] trait. The production implementation is
//! [`UciEngine`], a Stockfish subprocess spoken to over its stdin/stdout.
//!
//! Any [`EngineError`] is fatal to the whole server: the engine has no
//! resynchronisation protocol, and without it there is no source of board
//! truth left.

mod parse;
mod uci;

pub use parse::{parse_bestmove, parse_describe, parse_perft};
pub use uci::{SearchLimits, UciEngine};

use async_trait::async_trait;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to start engine `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("engine pipe broken: {0}")]
    Io(#[from] io::Error),
    #[error("engine closed its output")]
    Closed,
    #[error("expected `{expected}` from engine, got `{got}`")]
    Handshake { expected: &'static str, got: String },
    #[error("unparsable engine response: {0}")]
    Parse(String),
}

/// What the engine reports about a position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionReport {
    /// Board diagram, each line terminated by `\n`
    pub board: String,
    /// Position encoding after any candidate move was applied
    pub fen: String,
    /// Squares of pieces giving check, None when the side to move is not in check
    pub checkers: Option<String>,
}

impl PositionReport {
    pub fn in_check(&self) -> bool {
        self.checkers.is_some()
    }
}

/// Request/response interface to the engine.
///
/// Each call is a complete exchange: the engine session is reset, the full
/// position is set, and the query is answered before the call returns.
#[async_trait]
pub trait Engine: Send {
    /// Sets `fen`, plays `candidate` if given, and reports the resulting
    /// position. An illegal candidate leaves the encoding unchanged.
    async fn describe(
        &mut self,
        fen: &str,
        candidate: Option<&str>,
    ) -> Result<PositionReport, EngineError>;

    /// Every legal move for the side to move in `fen`
    async fn legal_moves(&mut self, fen: &str) -> Result<Vec<String>, EngineError>;

    /// The engine's chosen move for the side to move in `fen`
    async fn best_move(&mut self, fen: &str) -> Result<String, EngineError>;

    /// Terminates and reaps the engine; further calls fail
    async fn shutdown(&mut self);
}
