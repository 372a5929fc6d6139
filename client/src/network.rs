use crate::game::ClientGameState;
use crate::input::{interpret, Action};
use crate::{CANT_CONNECT_EXIT_CODE, SERVER_GONE_EXIT_CODE};
use log::{debug, info, warn};
use shared::{ClientCommand, ServerMessage};
use std::io;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("can't connect to port \"{port}\"")]
    Connect {
        port: String,
        #[source]
        source: io::Error,
    },
    #[error("server has gone away")]
    ServerGone,
}

impl ClientError {
    pub fn exit_code(&self) -> i32 {
        match self {
            ClientError::Connect { .. } => CANT_CONNECT_EXIT_CODE,
            ClientError::ServerGone => SERVER_GONE_EXIT_CODE,
        }
    }
}

/// How a client session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// The user typed `quit` or closed their input
    Quit,
    /// The server closed the connection or stopped accepting writes
    ServerGone,
}

pub async fn connect(port: &str) -> Result<TcpStream, ClientError> {
    let address = format!("localhost:{}", port);
    info!("Connecting to {}", address);
    TcpStream::connect(&address)
        .await
        .map_err(|source| ClientError::Connect {
            port: port.to_string(),
            source,
        })
}

/// Forwards complete input lines, newline removed, until EOF. A final line
/// without a newline is dropped.
pub fn spawn_input_reader<R>(mut reader: R) -> mpsc::UnboundedReceiver<String>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!("Failed to read input: {}", e);
                    break;
                }
            }
            let Some(text) = shared::strip_newline(&line) else {
                break;
            };
            if tx.send(text.to_string()).is_err() {
                break;
            }
        }
        debug!("Input closed");
    });
    rx
}

/// Terminal chess client: relays server lines to `out`, checks typed
/// commands locally and forwards the valid ones.
pub struct Client<W, O, E> {
    writer: W,
    out: O,
    err: E,
    game: ClientGameState,
    /// Request sent on connect and on `newgame`
    start: ClientCommand,
}

impl<W, O, E> Client<W, O, E>
where
    W: AsyncWrite + Unpin,
    O: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    pub fn new(writer: W, out: O, err: E, start: ClientCommand) -> Self {
        Self {
            writer,
            out,
            err,
            game: ClientGameState::new(),
            start,
        }
    }

    pub fn game(&self) -> &ClientGameState {
        &self.game
    }

    async fn send(&mut self, command: &ClientCommand) -> io::Result<()> {
        debug!("-> {}", command);
        self.writer
            .write_all(format!("{}\n", command).as_bytes())
            .await?;
        self.writer.flush().await
    }

    /// Shows one server line (newline removed) and tracks the game from it.
    /// Board framing lines are not shown.
    pub async fn handle_server_line(&mut self, line: &str) -> io::Result<()> {
        if line == "startboard" || line == "endboard" {
            return Ok(());
        }
        self.out.write_all(format!("{}\n", line).as_bytes()).await?;
        self.out.flush().await?;

        if let Some(message) = ServerMessage::parse_line(line) {
            self.game.observe(&message);
        }
        Ok(())
    }

    /// Acts on one typed line. Returns `Some` when the session should end.
    pub async fn handle_user_line(&mut self, line: &str) -> Option<Exit> {
        match interpret(line, &self.game, &self.start) {
            Ok(Action::Send(command)) => match self.send(&command).await {
                Ok(()) => None,
                Err(e) => {
                    debug!("Write to server failed: {}", e);
                    Some(Exit::ServerGone)
                }
            },
            Ok(Action::Quit) => Some(Exit::Quit),
            Err(rejection) => {
                let shown = self
                    .err
                    .write_all(format!("{}\n", rejection).as_bytes())
                    .await;
                if let Err(e) = shown {
                    warn!("Failed to show `{}`: {}", rejection, e);
                }
                None
            }
        }
    }

    /// Starts a game and serves the session until the user quits or the
    /// server goes away.
    pub async fn run<R>(mut self, mut server: R, mut input: mpsc::UnboundedReceiver<String>) -> Exit
    where
        R: AsyncBufRead + Unpin,
    {
        let start = self.start.clone();
        if self.send(&start).await.is_err() {
            return Exit::ServerGone;
        }

        let mut buffer = Vec::new();
        loop {
            tokio::select! {
                read = server.read_until(b'\n', &mut buffer) => {
                    match read {
                        Ok(0) => return Exit::ServerGone,
                        Ok(_) => {}
                        Err(e) => {
                            debug!("Read from server failed: {}", e);
                            return Exit::ServerGone;
                        }
                    }
                    let complete = buffer.ends_with(b"\n");
                    let text = String::from_utf8_lossy(&buffer).into_owned();
                    buffer.clear();

                    let line = text.strip_suffix('\n').unwrap_or(&text);
                    if let Err(e) = self.handle_server_line(line).await {
                        warn!("Failed to show server line: {}", e);
                    }
                    if !complete {
                        return Exit::ServerGone;
                    }
                }
                typed = input.recv() => match typed {
                    Some(line) => {
                        if let Some(exit) = self.handle_user_line(&line).await {
                            return exit;
                        }
                    }
                    None => return Exit::Quit,
                },
            }
        }
    }
}
