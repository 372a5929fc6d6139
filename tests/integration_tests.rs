//! Integration tests for the chess server
//!
//! These tests run the server library over real TCP sockets and in-memory
//! streams. Chess rules come from an in-process engine built on the `chess`
//! crate, so no external engine needs to be installed.

use async_trait::async_trait;
use chess::{Board, ChessMove, MoveGen};
use server::engine::{Engine, EngineError, PositionReport};
use server::game::Game;
use server::{Server, ServerState, SharedState};
use shared::{ClientCommand, Colour, Opponent, STARTING_FEN};
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

const WAIT: Duration = Duration::from_secs(5);

/// Engine answering from the `chess` crate's move generator.
///
/// Its best move is simply the first legal move generated.
#[derive(Clone, Default)]
struct RulesEngine {
    calls: Arc<AtomicUsize>,
    fail: bool,
    shut_down: Arc<AtomicBool>,
}

impl RulesEngine {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn board(&self, fen: &str) -> Result<Board, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail || self.shut_down.load(Ordering::SeqCst) {
            return Err(EngineError::Closed);
        }
        Board::from_str(fen).map_err(|e| EngineError::Parse(format!("{:?}", e)))
    }
}

/// One diagram row per rank, pieces as letters and empty squares as dots
fn diagram(fen: &str) -> String {
    let placement = fen.split_whitespace().next().unwrap_or_default();
    placement
        .split('/')
        .map(|rank| {
            let mut row = String::new();
            for square in rank.chars() {
                match square.to_digit(10) {
                    Some(empty) => row.extend(std::iter::repeat('.').take(empty as usize)),
                    None => row.push(square),
                }
            }
            row.push('\n');
            row
        })
        .collect()
}

#[async_trait]
impl Engine for RulesEngine {
    async fn describe(
        &mut self,
        fen: &str,
        candidate: Option<&str>,
    ) -> Result<PositionReport, EngineError> {
        let board = self.board(fen)?;
        let played = candidate
            .and_then(|token| ChessMove::from_str(token).ok())
            .filter(|candidate| MoveGen::new_legal(&board).any(|m| m == *candidate))
            .map(|candidate| board.make_move_new(candidate));

        let (fen, board) = match played {
            Some(after) => (after.to_string(), after),
            None => (fen.to_string(), board),
        };
        Ok(PositionReport {
            board: diagram(&fen),
            checkers: (board.checkers().popcnt() > 0).then(|| "x".to_string()),
            fen,
        })
    }

    async fn legal_moves(&mut self, fen: &str) -> Result<Vec<String>, EngineError> {
        let board = self.board(fen)?;
        Ok(MoveGen::new_legal(&board).map(|m| m.to_string()).collect())
    }

    async fn best_move(&mut self, fen: &str) -> Result<String, EngineError> {
        let board = self.board(fen)?;
        MoveGen::new_legal(&board)
            .next()
            .map(|m| m.to_string())
            .ok_or_else(|| EngineError::Parse("no legal move".into()))
    }

    async fn shutdown(&mut self) {
        self.shut_down.store(true, Ordering::SeqCst);
    }
}

struct TestServer {
    addr: SocketAddr,
    state: SharedState<RulesEngine>,
    handle: JoinHandle<EngineError>,
}

async fn start_server(engine: RulesEngine, max_clients: usize) -> TestServer {
    let server = Server::bind("127.0.0.1:0", ServerState::new(engine, max_clients, 16))
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();
    let state = server.state();
    let handle = tokio::spawn(server.run());
    TestServer {
        addr,
        state,
        handle,
    }
}

impl TestServer {
    /// Waits until `count` clients are queued for a human opponent
    async fn wait_for_waiting(&self, count: usize) {
        timeout(WAIT, async {
            while self.state.lock().await.waiting().len() != count {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("waiting list never reached expected size");
    }

    async fn wait_for_clients(&self, count: usize) {
        timeout(WAIT, async {
            while self.state.lock().await.clients().len() != count {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("client table never reached expected size");
    }
}

/// A protocol-level client over TCP
struct Player {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl Player {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, writer) = stream.into_split();
        Self {
            lines: BufReader::new(reader).lines(),
            writer,
        }
    }

    async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{}\n", line).as_bytes())
            .await
            .unwrap();
    }

    async fn recv(&mut self) -> String {
        timeout(WAIT, self.lines.next_line())
            .await
            .expect("timed out waiting for server")
            .unwrap()
            .expect("server closed the connection")
    }

    async fn is_closed(&mut self) -> bool {
        matches!(timeout(WAIT, self.lines.next_line()).await, Ok(Ok(None)) | Ok(Err(_)))
    }

    /// Sends `board` and returns the diagram rows between the framing lines
    async fn board(&mut self) -> Vec<String> {
        self.send("board").await;
        assert_eq!(self.recv().await, "startboard");
        let mut rows = Vec::new();
        loop {
            let line = self.recv().await;
            if line == "endboard" {
                return rows;
            }
            rows.push(line);
        }
    }
}

/// Connects two players and pairs them, first player white
async fn matched_pair(server: &TestServer) -> (Player, Player) {
    let mut white = Player::connect(server.addr).await;
    white.send("start human white").await;
    server.wait_for_waiting(1).await;

    let mut black = Player::connect(server.addr).await;
    black.send("start human either").await;
    assert_eq!(white.recv().await, "started white");
    assert_eq!(black.recv().await, "started black");
    (white, black)
}

/// Plays `moves` alternately, white first, checking the relay of each
async fn play(white: &mut Player, black: &mut Player, moves: &[&str]) {
    for (n, token) in moves.iter().enumerate() {
        let (mover, opponent) = if n % 2 == 0 {
            (&mut *white, &mut *black)
        } else {
            (&mut *black, &mut *white)
        };
        mover.send(&format!("move {}", token)).await;
        assert_eq!(mover.recv().await, "ok");
        assert_eq!(opponent.recv().await, format!("moved {}", token));
    }
}

/// GAMEPLAY TESTS
mod gameplay_tests {
    use super::*;

    #[tokio::test]
    async fn opening_move_is_relayed_and_shown_on_board() {
        let server = start_server(RulesEngine::default(), 8).await;
        let (mut white, mut black) = matched_pair(&server).await;

        let before = white.board().await;
        assert_eq!(before[4], "........");

        play(&mut white, &mut black, &["e2e4"]).await;

        let after = white.board().await;
        assert_eq!(after[4], "....P...");
        assert_eq!(after[6], "PPPP.PPP");
        assert_eq!(black.board().await, after);
    }

    #[tokio::test]
    async fn repeated_board_queries_are_identical() {
        let server = start_server(RulesEngine::default(), 8).await;
        let (mut white, mut black) = matched_pair(&server).await;
        play(&mut white, &mut black, &["d2d4", "d7d5"]).await;

        let first = white.board().await;
        let second = white.board().await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn turn_alternates_and_rejections_keep_it() {
        let server = start_server(RulesEngine::default(), 8).await;
        let (mut white, mut black) = matched_pair(&server).await;

        black.send("move e7e5").await;
        assert_eq!(black.recv().await, "error turn");

        white.send("move e2e5").await;
        assert_eq!(white.recv().await, "error move");
        white.send("move e7e5").await;
        assert_eq!(white.recv().await, "error move");

        play(&mut white, &mut black, &["e2e4"]).await;
        white.send("move d2d4").await;
        assert_eq!(white.recv().await, "error turn");
        play(&mut black, &mut white, &["e7e5"]).await;
    }

    #[tokio::test]
    async fn malformed_move_never_reaches_engine() {
        let engine = RulesEngine::default();
        let server = start_server(engine.clone(), 8).await;
        let (mut white, _black) = matched_pair(&server).await;
        let calls = engine.calls();

        for line in ["move e2e", "move e2e4e5", "move e2-4", "move", "move e2e4 now"] {
            white.send(line).await;
            assert_eq!(white.recv().await, "error command");
        }
        assert_eq!(engine.calls(), calls);

        let state = server.state.lock().await;
        let (_, game) = state.games().iter().next().unwrap();
        assert_eq!(game.fen(), STARTING_FEN);
        assert_eq!(game.turn(), Colour::White);
    }

    #[tokio::test]
    async fn fools_mate_ends_in_checkmate() {
        let server = start_server(RulesEngine::default(), 8).await;
        let (mut white, mut black) = matched_pair(&server).await;

        play(&mut white, &mut black, &["f2f3", "e7e5", "g2g4"]).await;
        black.send("move d8h4").await;
        assert_eq!(black.recv().await, "ok");
        assert_eq!(black.recv().await, "gameover checkmate black");
        assert_eq!(white.recv().await, "moved d8h4");
        assert_eq!(white.recv().await, "gameover checkmate black");

        white.send("move a2a3").await;
        assert_eq!(white.recv().await, "error game");
        assert!(server.state.lock().await.games().is_empty());
    }

    #[tokio::test]
    async fn check_is_announced_to_both_players() {
        let server = start_server(RulesEngine::default(), 8).await;
        let (mut white, mut black) = matched_pair(&server).await;

        play(&mut white, &mut black, &["e2e4", "f7f6"]).await;
        white.send("move d1h5").await;
        assert_eq!(white.recv().await, "ok");
        assert_eq!(white.recv().await, "check");
        assert_eq!(black.recv().await, "moved d1h5");
        assert_eq!(black.recv().await, "check");
    }

    #[tokio::test]
    async fn hints_list_moves_on_own_turn_only() {
        let server = start_server(RulesEngine::default(), 8).await;
        let (mut white, mut black) = matched_pair(&server).await;

        white.send("hint all").await;
        let all = white.recv().await;
        assert!(all.starts_with("moves "));
        assert_eq!(all.split(' ').count(), 21);

        white.send("hint best").await;
        let best = white.recv().await;
        assert_eq!(best.split(' ').count(), 2);

        black.send("hint all").await;
        assert_eq!(black.recv().await, "error turn");
    }

    #[tokio::test]
    async fn board_after_game_shows_final_position() {
        let server = start_server(RulesEngine::default(), 8).await;
        let mut idle = Player::connect(server.addr).await;
        idle.send("board").await;
        assert_eq!(idle.recv().await, "error game");

        let (mut white, mut black) = matched_pair(&server).await;
        play(&mut white, &mut black, &["a2a4"]).await;
        white.send("resign").await;
        assert_eq!(white.recv().await, "gameover resignation black");
        assert_eq!(black.recv().await, "gameover resignation black");

        let rows = black.board().await;
        assert_eq!(rows[4], "P.......");
        black.send("resign").await;
        assert_eq!(black.recv().await, "error game");
    }
}

/// COMPUTER OPPONENT TESTS
mod computer_tests {
    use super::*;

    #[tokio::test]
    async fn computer_replies_once_per_move() {
        let server = start_server(RulesEngine::default(), 8).await;
        let mut player = Player::connect(server.addr).await;

        player.send("start computer white").await;
        assert_eq!(player.recv().await, "started white");
        player.send("move e2e4").await;
        assert_eq!(player.recv().await, "ok");
        assert!(player.recv().await.starts_with("moved "));

        let state = server.state.lock().await;
        let (_, game) = state.games().iter().next().unwrap();
        assert_eq!(game.turn(), Colour::White);
        assert!(game.is_against_computer());
    }

    #[tokio::test]
    async fn computer_opens_when_human_plays_black() {
        let server = start_server(RulesEngine::default(), 8).await;
        let mut player = Player::connect(server.addr).await;

        player.send("start computer black").await;
        assert_eq!(player.recv().await, "started black");
        assert!(player.recv().await.starts_with("moved "));

        player.send("hint all").await;
        assert!(player.recv().await.starts_with("moves "));
    }

    #[tokio::test]
    async fn either_colour_against_computer_plays_white() {
        let server = start_server(RulesEngine::default(), 8).await;
        let mut player = Player::connect(server.addr).await;

        player.send("start computer either").await;
        assert_eq!(player.recv().await, "started white");
    }

    #[tokio::test]
    async fn new_start_resigns_current_game() {
        let server = start_server(RulesEngine::default(), 8).await;
        let mut player = Player::connect(server.addr).await;

        player.send("start computer white").await;
        assert_eq!(player.recv().await, "started white");
        player.send("start computer white").await;
        assert_eq!(player.recv().await, "gameover resignation black");
        assert_eq!(player.recv().await, "started white");
        assert_eq!(server.state.lock().await.games().len(), 1);
    }
}

/// MATCHMAKING AND LIFECYCLE TESTS
mod lifecycle_tests {
    use super::*;

    #[tokio::test]
    async fn earliest_compatible_waiter_is_matched() {
        let server = start_server(RulesEngine::default(), 8).await;

        let mut first = Player::connect(server.addr).await;
        first.send("start human white").await;
        server.wait_for_waiting(1).await;
        let mut second = Player::connect(server.addr).await;
        second.send("start human white").await;
        server.wait_for_waiting(2).await;

        let mut third = Player::connect(server.addr).await;
        third.send("start human either").await;
        assert_eq!(first.recv().await, "started white");
        assert_eq!(third.recv().await, "started black");
        server.wait_for_waiting(1).await;

        let mut fourth = Player::connect(server.addr).await;
        fourth.send("start human black").await;
        assert_eq!(second.recv().await, "started white");
        assert_eq!(fourth.recv().await, "started black");
        server.wait_for_waiting(0).await;
    }

    #[tokio::test]
    async fn disconnect_resigns_for_opponent() {
        let server = start_server(RulesEngine::default(), 8).await;
        let (mut white, black) = matched_pair(&server).await;

        drop(black);
        assert_eq!(white.recv().await, "gameover resignation white");
        server.wait_for_clients(1).await;
        assert!(server.state.lock().await.games().is_empty());
    }

    #[tokio::test]
    async fn waiting_client_leaving_is_forgotten() {
        let server = start_server(RulesEngine::default(), 8).await;
        let mut early = Player::connect(server.addr).await;
        early.send("start human either").await;
        server.wait_for_waiting(1).await;
        drop(early);
        server.wait_for_waiting(0).await;

        let mut late = Player::connect(server.addr).await;
        late.send("start human either").await;
        server.wait_for_waiting(1).await;
    }

    #[tokio::test]
    async fn malformed_lines_keep_connection_open() {
        let server = start_server(RulesEngine::default(), 8).await;
        let mut player = Player::connect(server.addr).await;

        let malformed = [
            "",
            " board",
            "board ",
            "start  human white",
            "hint",
            "start human red",
            "dance",
        ];
        for line in malformed {
            player.send(line).await;
            assert_eq!(player.recv().await, "error command");
        }
        player.send("resign").await;
        assert_eq!(player.recv().await, "error game");
        player.send("hint best").await;
        assert_eq!(player.recv().await, "error game");
    }

    #[tokio::test]
    async fn full_client_table_refuses_connection() {
        let server = start_server(RulesEngine::default(), 1).await;
        let mut first = Player::connect(server.addr).await;
        server.wait_for_clients(1).await;

        let mut second = Player::connect(server.addr).await;
        assert!(second.is_closed().await);

        first.send("board").await;
        assert_eq!(first.recv().await, "error game");
    }

    #[tokio::test]
    async fn engine_failure_stops_server() {
        let engine = RulesEngine::failing();
        let server = start_server(engine.clone(), 8).await;
        let mut player = Player::connect(server.addr).await;

        player.send("start computer white").await;
        assert_eq!(player.recv().await, "started white");
        player.send("move e2e4").await;

        let failure = timeout(WAIT, server.handle).await.unwrap().unwrap();
        assert!(matches!(failure, EngineError::Closed));
        assert!(engine.shut_down.load(Ordering::SeqCst));
    }
}

/// TERMINAL CLIENT TESTS
mod client_tests {
    use super::*;
    use client::network::{Client, Exit};
    use tokio::sync::mpsc;

    async fn shown_line(lines: &mut Lines<BufReader<DuplexStream>>) -> String {
        timeout(WAIT, lines.next_line())
            .await
            .unwrap()
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn terminal_client_plays_against_computer() {
        let server = start_server(RulesEngine::default(), 8).await;
        let stream = TcpStream::connect(server.addr).await.unwrap();
        let (reader, writer) = stream.into_split();
        let (out, shown) = tokio::io::duplex(4096);
        let mut shown = BufReader::new(shown).lines();
        let (input_tx, input) = mpsc::unbounded_channel();

        let start = ClientCommand::Start {
            opponent: Opponent::Computer,
            colour: Some(Colour::White),
        };
        let client = Client::new(writer, out, tokio::io::sink(), start);
        let session = tokio::spawn(client.run(BufReader::new(reader), input));

        assert_eq!(shown_line(&mut shown).await, "started white");
        input_tx.send("move e2e4".to_string()).unwrap();
        assert_eq!(shown_line(&mut shown).await, "ok");
        assert!(shown_line(&mut shown).await.starts_with("moved "));

        input_tx.send("quit".to_string()).unwrap();
        assert_eq!(timeout(WAIT, session).await.unwrap().unwrap(), Exit::Quit);
    }
}

/// IN-MEMORY SESSION TESTS
mod state_tests {
    use super::*;

    fn join(
        state: &mut ServerState<RulesEngine>,
        name: &str,
    ) -> (server::client_manager::ClientId, Lines<BufReader<DuplexStream>>) {
        let (near, far) = tokio::io::duplex(4096);
        let id = state.connect(name.to_string(), Box::new(near)).unwrap();
        (id, BufReader::new(far).lines())
    }

    async fn next(lines: &mut Lines<BufReader<DuplexStream>>) -> String {
        lines.next_line().await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn queen_stalemate_has_no_winner() {
        let mut state = ServerState::new(RulesEngine::default(), 4, 4);
        let (white, mut white_lines) = join(&mut state, "white");
        let (black, mut black_lines) = join(&mut state, "black");
        let position = "k7/8/1K6/2Q5/8/8/8/8 w - - 0 1";
        state
            .seat_game(Game::between(white, black).from_position(position))
            .unwrap();

        state.handle_line(white, "move c5c7").await.unwrap();

        assert_eq!(next(&mut white_lines).await, "ok");
        assert_eq!(next(&mut white_lines).await, "gameover stalemate");
        assert_eq!(next(&mut black_lines).await, "moved c5c7");
        assert_eq!(next(&mut black_lines).await, "gameover stalemate");
        assert!(state.games().is_empty());
    }

    #[tokio::test]
    async fn king_and_pawn_stalemate_has_no_winner() {
        let mut state = ServerState::new(RulesEngine::default(), 4, 4);
        let (white, mut white_lines) = join(&mut state, "white");
        let (black, mut black_lines) = join(&mut state, "black");
        let position = "7k/7P/5K2/8/8/8/8/8 w - - 0 1";
        state
            .seat_game(Game::between(white, black).from_position(position))
            .unwrap();

        state.handle_line(white, "move f6g6").await.unwrap();

        assert_eq!(next(&mut white_lines).await, "ok");
        assert_eq!(next(&mut white_lines).await, "gameover stalemate");
        assert_eq!(next(&mut black_lines).await, "moved f6g6");
        assert_eq!(next(&mut black_lines).await, "gameover stalemate");
        assert!(state.games().is_empty());
    }

    #[tokio::test]
    async fn game_seats_match_client_colours() {
        let mut state = ServerState::new(RulesEngine::default(), 4, 4);
        let (white, _white_lines) = join(&mut state, "white");
        let (black, _black_lines) = join(&mut state, "black");
        let game_id = state.seat_game(Game::between(white, black)).unwrap();

        let game = state.games().get(game_id).unwrap();
        for colour in [Colour::White, Colour::Black] {
            let player = game.player(colour).unwrap();
            assert_eq!(state.clients().get(player).unwrap().colour, Some(colour));
        }
    }

    #[tokio::test]
    async fn engine_error_is_returned_from_handle_line() {
        let mut state = ServerState::new(RulesEngine::failing(), 4, 4);
        let (player, mut lines) = join(&mut state, "player");

        state
            .handle_line(player, "start computer white")
            .await
            .unwrap();
        assert_eq!(next(&mut lines).await, "started white");

        let result = state.handle_line(player, "board").await;
        assert!(matches!(result, Err(EngineError::Closed)));
    }
}
