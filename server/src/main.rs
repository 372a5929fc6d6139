use clap::error::ErrorKind;
use clap::Parser;
use log::info;
use server::config::{ServerConfig, DEFAULT_CAPACITY, INVALID_ARGS_EXIT_CODE};
use server::engine::SearchLimits;
use server::{Server, ServerError, ServerState, UciEngine};
use std::process;
use tokio::net::TcpListener;

/// Networked chess server refereed by an external engine
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Port to listen on; 0 picks a free port
    #[arg(long = "listenOn", default_value = "0")]
    listen_on: String,
    /// Engine executable speaking UCI
    #[arg(long, default_value = "stockfish")]
    engine: String,
    /// Maximum number of connected clients
    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    max_clients: usize,
    /// Maximum number of games in progress
    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    max_games: usize,
    /// Search time per computer move, in milliseconds
    #[arg(long, default_value_t = 500)]
    movetime: u64,
    /// Search depth per computer move
    #[arg(long, default_value_t = 15)]
    depth: u32,
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            let _ = e.print();
            process::exit(INVALID_ARGS_EXIT_CODE);
        }
    };

    let config = ServerConfig {
        engine_program: args.engine,
        search_limits: SearchLimits {
            movetime_ms: args.movetime,
            depth: args.depth,
        },
        max_clients: args.max_clients,
        max_games: args.max_games,
    };

    if let Err(e) = run(&args.listen_on, config).await {
        eprintln!("server: {}", e);
        process::exit(e.exit_code());
    }
}

/// Listens, starts the engine, then serves until the engine fails or the
/// process is interrupted.
async fn run(port: &str, config: ServerConfig) -> Result<(), ServerError> {
    let address = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| ServerError::Listen {
            port: port.to_string(),
            source,
        })?;

    let engine = UciEngine::spawn(&config.engine_program, config.search_limits)
        .await
        .map_err(ServerError::EngineStart)?;

    let server = Server::new(listener, ServerState::from_config(engine, &config));
    let local = server.local_addr().map_err(|source| ServerError::Listen {
        port: port.to_string(),
        source,
    })?;
    eprintln!("{}", local.port());
    info!("Server listening on {}", local);

    tokio::select! {
        failure = server.run() => Err(ServerError::EngineFailure(failure)),
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
            Ok(())
        }
    }
}
