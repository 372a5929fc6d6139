//! Parsers for Stockfish's textual responses.

use super::{EngineError, PositionReport};

const FEN_PREFIX: &str = "Fen:";
const CHECKERS_PREFIX: &str = "Checkers:";
const NODES_PREFIX: &str = "Nodes searched:";
const BESTMOVE_PREFIX: &str = "bestmove";

/// Parses the output of `d`, from the first line after the command up to
/// and including the `Checkers:` line.
///
/// Everything before `Fen:` is the board diagram; blank lines around it are
/// dropped.
pub fn parse_describe(lines: &[String]) -> Result<PositionReport, EngineError> {
    let fen_at = lines
        .iter()
        .position(|line| line.starts_with(FEN_PREFIX))
        .ok_or_else(|| EngineError::Parse("board description has no Fen line".into()))?;

    let diagram: Vec<&str> = lines[..fen_at]
        .iter()
        .map(|line| line.as_str())
        .skip_while(|line| line.trim().is_empty())
        .collect();
    let trailing_blank = diagram
        .iter()
        .rev()
        .take_while(|line| line.trim().is_empty())
        .count();
    let diagram = &diagram[..diagram.len() - trailing_blank];
    if diagram.is_empty() {
        return Err(EngineError::Parse("board description has no diagram".into()));
    }
    let board: String = diagram.iter().map(|line| format!("{}\n", line)).collect();

    let fen = lines[fen_at][FEN_PREFIX.len()..].trim().to_string();
    if fen.is_empty() {
        return Err(EngineError::Parse("empty Fen line".into()));
    }

    let checkers = lines[fen_at..]
        .iter()
        .find_map(|line| line.strip_prefix(CHECKERS_PREFIX))
        .ok_or_else(|| EngineError::Parse("board description has no Checkers line".into()))?
        .trim();
    let checkers = (!checkers.is_empty()).then(|| checkers.to_string());

    Ok(PositionReport {
        board,
        fen,
        checkers,
    })
}

/// Parses `go perft 1` output up to and including `Nodes searched: N`.
///
/// Each legal move appears as `<move>: 1`; the node count must agree with
/// the number of moves listed.
pub fn parse_perft(lines: &[String]) -> Result<Vec<String>, EngineError> {
    let mut moves = Vec::new();
    let mut nodes = None;

    for line in lines {
        let line = line.trim();
        if let Some(count) = line.strip_prefix(NODES_PREFIX) {
            let count: usize = count
                .trim()
                .parse()
                .map_err(|_| EngineError::Parse(format!("bad node count `{}`", line)))?;
            nodes = Some(count);
            break;
        }
        match line.split_once(':') {
            Some((token, _)) if shared::is_valid_move(token.trim()) => {
                moves.push(token.trim().to_string())
            }
            _ => {}
        }
    }

    match nodes {
        Some(count) if count == moves.len() => Ok(moves),
        Some(count) => Err(EngineError::Parse(format!(
            "perft listed {} moves but counted {} nodes",
            moves.len(),
            count
        ))),
        None => Err(EngineError::Parse("perft output has no node count".into())),
    }
}

/// Extracts the move from a `bestmove <move> [ponder <move>]` line
pub fn parse_bestmove(line: &str) -> Result<String, EngineError> {
    let mut tokens = line.split_whitespace();
    match (tokens.next(), tokens.next()) {
        (Some(BESTMOVE_PREFIX), Some(token)) if shared::is_valid_move(token) => {
            Ok(token.to_string())
        }
        _ => Err(EngineError::Parse(format!("bad bestmove line `{}`", line))),
    }
}
