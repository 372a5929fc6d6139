//! Server-wide settings and process exit codes.

use crate::engine::SearchLimits;

/// Default size of both the client and the game tables
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Bad command-line arguments
pub const INVALID_ARGS_EXIT_CODE: i32 = 8;
/// The listening socket could not be set up
pub const CANT_LISTEN_EXIT_CODE: i32 = 20;
/// The engine could not be started or did not complete its startup handshake
pub const CANT_START_ENGINE_EXIT_CODE: i32 = 4;
/// The engine failed while the server was running
pub const ENGINE_FAILURE_EXIT_CODE: i32 = 1;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Engine executable, looked up on PATH
    pub engine_program: String,
    pub search_limits: SearchLimits,
    pub max_clients: usize,
    pub max_games: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            engine_program: "stockfish".to_string(),
            search_limits: SearchLimits::default(),
            max_clients: DEFAULT_CAPACITY,
            max_games: DEFAULT_CAPACITY,
        }
    }
}
