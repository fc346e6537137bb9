//! UCI engine wrapper (async I/O)

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, warn};

use puzzle_core::tree::fen_string;
use puzzle_core::{Candidate, GameTree, NodeId, PovScore, Score, TreeError};
use puzzle_cooker::{CookError, Engine, Limit};
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Position};

use crate::error::WorkerError;

/// One `info` line that carries a scored principal variation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoLine {
    /// 1-based rank of the line
    pub multipv: usize,
    /// Score relative to the side to move
    pub score: Score,
    /// First move of the principal variation, in UCI
    pub first_move: String,
}

/// A UCI engine process
pub struct UciEngine {
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    multipv: usize,
}

impl UciEngine {
    /// Spawn the engine process and initialize UCI.
    pub async fn spawn(path: &str, threads: u32, hash_mb: u32) -> Result<Self, WorkerError> {
        let mut process = Command::new(path)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| WorkerError::Engine(format!("Failed to spawn {path}: {e}")))?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| WorkerError::Engine("Engine stdin unavailable".into()))?;
        let stdout = process
            .stdout
            .take()
            .map(BufReader::new)
            .ok_or_else(|| WorkerError::Engine("Engine stdout unavailable".into()))?;

        let mut engine = Self {
            process,
            stdin,
            stdout,
            multipv: 1,
        };

        engine.init(threads, hash_mb).await?;
        Ok(engine)
    }

    async fn init(&mut self, threads: u32, hash_mb: u32) -> Result<(), CookError> {
        self.send("uci").await?;
        self.wait_for("uciok").await?;

        self.send(&format!("setoption name Threads value {threads}"))
            .await?;
        self.send(&format!("setoption name Hash value {hash_mb}"))
            .await?;
        self.send("setoption name MultiPV value 1").await?;
        self.send("isready").await?;
        self.wait_for("readyok").await
    }

    async fn send(&mut self, cmd: &str) -> Result<(), CookError> {
        debug!(cmd, "UCI <");
        self.stdin
            .write_all(format!("{cmd}\n").as_bytes())
            .await
            .map_err(|e| CookError::EngineUnavailable(format!("Failed to write to engine: {e}")))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| CookError::EngineUnavailable(format!("Failed to flush stdin: {e}")))
    }

    /// Next output line, trimmed. EOF means the engine is gone.
    async fn read_line(&mut self) -> Result<String, CookError> {
        let mut line = String::new();
        let read = self
            .stdout
            .read_line(&mut line)
            .await
            .map_err(|e| CookError::EngineUnavailable(format!("Failed to read from engine: {e}")))?;
        if read == 0 {
            return Err(CookError::EngineUnavailable("Engine closed its output".into()));
        }
        Ok(line.trim().to_string())
    }

    async fn wait_for(&mut self, expected: &str) -> Result<(), CookError> {
        loop {
            let line = self.read_line().await?;
            debug!(line = %line, "UCI >");
            if line == expected {
                return Ok(());
            }
        }
    }

    async fn set_multipv(&mut self, multipv: usize) -> Result<(), CookError> {
        if self.multipv != multipv {
            self.send(&format!("setoption name MultiPV value {multipv}"))
                .await?;
            self.multipv = multipv;
        }
        Ok(())
    }

    /// Send quit command and wait for process to exit
    pub async fn quit(&mut self) {
        let _ = self.send("quit").await;
        let _ = self.process.wait().await;
    }
}

impl Engine for UciEngine {
    async fn new_game(&mut self) -> Result<(), CookError> {
        self.send("ucinewgame").await?;
        self.send("isready").await?;
        self.wait_for("readyok").await
    }

    async fn analyze(
        &mut self,
        tree: &GameTree,
        node: NodeId,
        limit: &Limit,
        multipv: usize,
    ) -> Result<Vec<Candidate>, CookError> {
        let position = tree.position(node);
        if position.legal_moves().is_empty() {
            return Ok(Vec::new());
        }

        let moves: Vec<String> = tree
            .moves_to(node)
            .iter()
            .map(|m| m.to_uci(CastlingMode::Standard).to_string())
            .collect();

        self.set_multipv(multipv.max(1)).await?;
        self.send(&position_command(&fen_string(tree.origin()), &moves))
            .await?;
        self.send(&go_command(limit)).await?;

        let mut lines: Vec<Option<InfoLine>> = vec![None; multipv.max(1)];
        loop {
            let line = self.read_line().await?;
            if line.starts_with("bestmove") {
                break;
            }
            if let Some(info) = parse_info(&line) {
                if let Some(slot) = lines.get_mut(info.multipv.wrapping_sub(1)) {
                    *slot = Some(info);
                }
            }
        }

        let turn = position.turn();
        let mut candidates = Vec::with_capacity(lines.len());
        for info in lines.into_iter().flatten() {
            let mv = info
                .first_move
                .parse::<UciMove>()
                .map_err(|_| TreeError::InvalidMove(info.first_move.clone()))?
                .to_move(position)
                .map_err(|_| TreeError::IllegalMove {
                    uci: info.first_move.clone(),
                    fen: fen_string(position),
                })?;
            candidates.push(Candidate {
                mv,
                score: PovScore::new(info.score, turn),
            });
        }

        if candidates.is_empty() {
            warn!(fen = %fen_string(position), "Engine returned no principal variation");
        }
        Ok(candidates)
    }
}

/// `position` command replaying the game from its origin, so the engine
/// sees the history it needs for repetitions.
pub fn position_command(origin_fen: &str, moves: &[String]) -> String {
    if moves.is_empty() {
        format!("position fen {origin_fen}")
    } else {
        format!("position fen {origin_fen} moves {}", moves.join(" "))
    }
}

pub fn go_command(limit: &Limit) -> String {
    let mut cmd = String::from("go");
    if let Some(depth) = limit.depth {
        cmd.push_str(&format!(" depth {depth}"));
    }
    if let Some(time) = limit.time {
        cmd.push_str(&format!(" movetime {}", time.as_millis()));
    }
    if let Some(nodes) = limit.nodes {
        cmd.push_str(&format!(" nodes {nodes}"));
    }
    if cmd == "go" {
        // A bare `go` never returns.
        cmd.push_str(" depth 1");
    }
    cmd
}

/// Parse an `info` line with an exact score and a principal variation.
/// Bound scores and lines without a move are skipped.
pub fn parse_info(line: &str) -> Option<InfoLine> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.first() != Some(&"info") {
        return None;
    }

    let mut multipv = 1;
    let mut score = None;
    let mut first_move = None;

    let mut i = 1;
    while i < parts.len() {
        match parts[i] {
            "multipv" => {
                multipv = parts.get(i + 1)?.parse().ok()?;
                i += 2;
            }
            "score" => {
                let value: i32 = parts.get(i + 2)?.parse().ok()?;
                score = match *parts.get(i + 1)? {
                    "cp" => Some(Score::Cp(value)),
                    "mate" if value != 0 => Some(Score::Mate(value)),
                    _ => return None,
                };
                i += 3;
            }
            "lowerbound" | "upperbound" => return None,
            "pv" => {
                first_move = parts.get(i + 1).map(|m| m.to_string());
                break;
            }
            _ => i += 1,
        }
    }

    Some(InfoLine {
        multipv,
        score: score?,
        first_move: first_move?,
    })
}
