//! Worker configuration from environment variables and the command line

use std::env;
use std::path::PathBuf;

use puzzle_core::game_record::MAX_PLY;
use puzzle_cooker::CookConfig;

use crate::error::WorkerError;

#[derive(Clone, Debug)]
pub struct WorkerConfig {
    /// Database connection URL, only needed when puzzles are persisted
    pub database_url: Option<String>,

    /// Path to the UCI engine binary
    pub engine_path: String,

    /// Threads per engine process
    pub engine_threads: u32,

    /// Hash table size per engine process, in MB
    pub engine_hash_mb: u32,

    /// Games analyzed in parallel, one engine each
    pub workers: usize,

    /// Lines skipped after a game that already produced puzzles
    pub duplicate_skip: usize,

    /// Plies of each game loaded for analysis
    pub max_ply: u32,

    pub allow_mate_in_one: bool,
}

impl WorkerConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, WorkerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, WorkerError> {
        let database_url = lookup("DATABASE_URL").filter(|v| !v.is_empty());

        let engine_path =
            lookup("ENGINE_PATH").unwrap_or_else(|| "/usr/local/bin/stockfish".to_string());

        let engine_threads = parse_var::<u32>(&lookup, "ENGINE_THREADS")?.unwrap_or(2).max(1);
        let engine_hash_mb = parse_var(&lookup, "ENGINE_HASH_MB")?.unwrap_or(256);

        let workers = match parse_var::<usize>(&lookup, "WORKERS")? {
            Some(n) => n.max(1),
            None => (num_cpus::get() / engine_threads as usize).max(1),
        };

        let duplicate_skip = parse_var(&lookup, "DUPLICATE_SKIP")?.unwrap_or(50);
        let max_ply = parse_var(&lookup, "MAX_PLY")?.unwrap_or(MAX_PLY);
        let allow_mate_in_one = parse_var(&lookup, "ALLOW_MATE_IN_ONE")?.unwrap_or(true);

        Ok(Self {
            database_url,
            engine_path,
            engine_threads,
            engine_hash_mb,
            workers,
            duplicate_skip,
            max_ply,
            allow_mate_in_one,
        })
    }

    pub fn database_url(&self) -> Result<&str, WorkerError> {
        self.database_url
            .as_deref()
            .ok_or_else(|| WorkerError::Config("DATABASE_URL not set".into()))
    }

    pub fn cook_config(&self) -> CookConfig {
        CookConfig {
            allow_mate_in_one: self.allow_mate_in_one,
            ..CookConfig::default()
        }
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, WorkerError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| WorkerError::Config(format!("{key} has invalid value {raw:?}"))),
    }
}

/// Command line arguments.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Args {
    /// Game file, one `id;fen;moves` record per line
    pub file: PathBuf,
    /// Lines to skip before the first game
    pub skip: usize,
    /// Keep puzzles in memory instead of the database
    pub dry_run: bool,
    pub verbose: bool,
}

impl Args {
    pub fn parse() -> Result<Self, WorkerError> {
        Self::parse_from(env::args().skip(1))
    }

    /// Parse arguments, program name excluded.
    pub fn parse_from<I, S>(args: I) -> Result<Self, WorkerError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args = args.into_iter().map(Into::<String>::into);
        let mut file = None;
        let mut parsed = Args::default();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--file" | "-f" => {
                    let path = args
                        .next()
                        .ok_or_else(|| WorkerError::Config("--file needs a path".into()))?;
                    file = Some(PathBuf::from(path));
                }
                "--skip" => {
                    let n = args
                        .next()
                        .ok_or_else(|| WorkerError::Config("--skip needs a count".into()))?;
                    parsed.skip = n
                        .parse()
                        .map_err(|_| WorkerError::Config(format!("Invalid --skip value {n:?}")))?;
                }
                "--dry-run" => parsed.dry_run = true,
                "--verbose" | "-v" => parsed.verbose = true,
                other => {
                    return Err(WorkerError::Config(format!("Unknown argument {other:?}")));
                }
            }
        }

        parsed.file = file.ok_or_else(|| WorkerError::Config("--file is required".into()))?;
        Ok(parsed)
    }
}
