//! Server error types.

use crate::config::{CANT_LISTEN_EXIT_CODE, CANT_START_ENGINE_EXIT_CODE, ENGINE_FAILURE_EXIT_CODE};
use crate::engine::EngineError;
use shared::ProtocolError;
use std::io;
use thiserror::Error;

/// Why a single client command was not carried out
#[derive(Debug, Error)]
pub enum CommandError {
    /// Reported back to the client as `error <kind>`
    #[error("{0}")]
    Protocol(#[from] ProtocolError),
    /// Fatal to the whole server
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Reasons the server process stops
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("can't start listening on port \"{port}\"")]
    Listen {
        port: String,
        #[source]
        source: io::Error,
    },
    #[error("cannot start communication with chess engine")]
    EngineStart(#[source] EngineError),
    #[error("chess engine failed: {0}")]
    EngineFailure(#[source] EngineError),
}

impl ServerError {
    pub fn exit_code(&self) -> i32 {
        match self {
            ServerError::Listen { .. } => CANT_LISTEN_EXIT_CODE,
            ServerError::EngineStart(_) => CANT_START_ENGINE_EXIT_CODE,
            ServerError::EngineFailure(_) => ENGINE_FAILURE_EXIT_CODE,
        }
    }
}
