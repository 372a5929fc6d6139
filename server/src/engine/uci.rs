//! Stockfish driven over the UCI text protocol.
//!
//! Every query starts from a clean engine session:
//! `ucinewgame` + `isready` (the next meaningful line must be `readyok`),
//! then `position fen ...`, then the query itself.

use super::{parse_bestmove, parse_describe, parse_perft, Engine, EngineError, PositionReport};
use async_trait::async_trait;
use log::{debug, info, warn};
use std::process::Stdio;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

/// Limits passed to `go` when asking for a best move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    pub movetime_ms: u64,
    pub depth: u32,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            movetime_ms: 500,
            depth: 15,
        }
    }
}

/// Engine spoken to over a pair of line-oriented streams
pub struct UciEngine<R, W> {
    reader: R,
    writer: W,
    /// Subprocess owning the streams, if any
    child: Option<Child>,
    limits: SearchLimits,
}

impl UciEngine<BufReader<ChildStdout>, ChildStdin> {
    /// Starts `program` as a subprocess and completes the startup handshake
    pub async fn spawn(program: &str, limits: SearchLimits) -> Result<Self, EngineError> {
        let mut child = Command::new(program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| EngineError::Spawn {
                program: program.to_string(),
                source,
            })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            return Err(EngineError::Closed);
        };

        let mut engine = UciEngine::new(BufReader::new(stdout), stdin, limits);
        engine.child = Some(child);

        if let Err(e) = engine.start().await {
            engine.shutdown().await;
            return Err(e);
        }

        info!("Engine `{}` ready", program);
        Ok(engine)
    }
}

impl<R, W> UciEngine<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W, limits: SearchLimits) -> Self {
        Self {
            reader,
            writer,
            child: None,
            limits,
        }
    }

    /// Startup handshake: `isready`/`readyok` then `uci`/`uciok`
    pub async fn start(&mut self) -> Result<(), EngineError> {
        self.send("isready\n").await?;
        self.wait_for("readyok").await?;
        self.send("uci\n").await?;
        self.wait_for("uciok").await
    }

    async fn send(&mut self, text: &str) -> Result<(), EngineError> {
        debug!("engine <- {}", text.trim_end());
        self.writer.write_all(text.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn read_line(&mut self) -> Result<String, EngineError> {
        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Err(EngineError::Closed);
        }
        let line = line.trim_end_matches(|c: char| c == '\n' || c == '\r').to_string();
        debug!("engine -> {}", line);
        Ok(line)
    }

    /// Skips lines until one equals `expected`
    async fn wait_for(&mut self, expected: &'static str) -> Result<(), EngineError> {
        while self.read_line().await? != expected {}
        Ok(())
    }

    /// Collects lines up to and including the first one starting with `prefix`
    async fn read_until(&mut self, prefix: &str) -> Result<Vec<String>, EngineError> {
        let mut lines = Vec::new();
        loop {
            let line = self.read_line().await?;
            let done = line.starts_with(prefix);
            lines.push(line);
            if done {
                return Ok(lines);
            }
        }
    }

    /// Resets the engine session and waits for it to become ready
    async fn new_game(&mut self) -> Result<(), EngineError> {
        self.send("ucinewgame\nisready\n").await?;
        loop {
            let line = self.read_line().await?;
            if line.trim().is_empty() || line.starts_with("info") {
                continue;
            }
            if line == "readyok" {
                return Ok(());
            }
            return Err(EngineError::Handshake {
                expected: "readyok",
                got: line,
            });
        }
    }

    async fn set_position(
        &mut self,
        fen: &str,
        candidate: Option<&str>,
    ) -> Result<(), EngineError> {
        self.new_game().await?;
        let command = match candidate {
            Some(token) => format!("position fen {} moves {}\n", fen, token),
            None => format!("position fen {}\n", fen),
        };
        self.send(&command).await
    }
}

#[async_trait]
impl<R, W> Engine for UciEngine<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn describe(
        &mut self,
        fen: &str,
        candidate: Option<&str>,
    ) -> Result<PositionReport, EngineError> {
        self.set_position(fen, candidate).await?;
        self.send("d\n").await?;
        let lines = self.read_until("Checkers:").await?;
        parse_describe(&lines)
    }

    async fn legal_moves(&mut self, fen: &str) -> Result<Vec<String>, EngineError> {
        self.set_position(fen, None).await?;
        self.send("go perft 1\n").await?;
        let lines = self.read_until("Nodes searched:").await?;
        parse_perft(&lines)
    }

    async fn best_move(&mut self, fen: &str) -> Result<String, EngineError> {
        self.set_position(fen, None).await?;
        let go = format!(
            "go movetime {} depth {}\n",
            self.limits.movetime_ms, self.limits.depth
        );
        self.send(&go).await?;
        loop {
            let line = self.read_line().await?;
            if line.starts_with("bestmove") {
                return parse_bestmove(&line);
            }
        }
    }

    async fn shutdown(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        if let Err(e) = child.start_kill() {
            warn!("Failed to kill engine: {}", e);
        }
        match child.wait().await {
            Ok(status) => info!("Engine exited ({})", status),
            Err(e) => warn!("Failed to reap engine: {}", e),
        }
    }
}
