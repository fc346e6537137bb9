//! Game file runner: reads games, dispatches them over the engine pool and
//! persists what the cooker finds.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use puzzle_core::game_record::parse_game_line;
use puzzle_core::GameTree;
use puzzle_cooker::{analyze_game, CookConfig, Engine, PuzzleRecord, PuzzleStore, GENERATOR_VERSION};

use crate::error::WorkerError;

/// Counters for one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Game lines read after the initial skip
    pub games_read: usize,
    pub analyzed: usize,
    /// Duplicate games and the lines skipped after them
    pub skipped: usize,
    pub failed: usize,
    pub puzzles: usize,
}

/// What the runner needs beyond the cook thresholds.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub skip: usize,
    pub duplicate_skip: usize,
    pub max_ply: u32,
    pub cook: CookConfig,
}

/// Idle engines. A semaphore with one permit per engine guards checkout.
pub struct EnginePool<E> {
    idle: Mutex<Vec<E>>,
    size: usize,
}

impl<E> EnginePool<E> {
    pub fn new(engines: Vec<E>) -> Self {
        let size = engines.len();
        Self {
            idle: Mutex::new(engines),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    fn checkout(&self) -> Option<E> {
        self.lock().pop()
    }

    fn checkin(&self, engine: E) {
        self.lock().push(engine);
    }

    /// Take every idle engine out of the pool.
    pub fn drain(&self) -> Vec<E> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<E>> {
        self.idle.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Analyze one game and persist its puzzles. Returns the stored records.
pub async fn process_game<E: Engine, S: PuzzleStore>(
    engine: &mut E,
    store: &S,
    tree: &mut GameTree,
    config: &CookConfig,
) -> Result<Vec<PuzzleRecord>, WorkerError> {
    engine.new_game().await?;
    let puzzles = analyze_game(engine, store, tree, config).await?;

    let mut records = Vec::with_capacity(puzzles.len());
    for puzzle in &puzzles {
        let Some(record) = PuzzleRecord::from_puzzle(tree, puzzle, GENERATOR_VERSION) else {
            warn!(game_id = tree.id(), "Puzzle anchored at the root, dropping");
            continue;
        };
        store.store_puzzle(&record).await?;
        records.push(record);
    }
    Ok(records)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Run every game from `input` through the engine pool until the input ends,
/// `shutdown` resolves, or an engine dies. In-flight games always finish.
/// Every stored puzzle is also printed as a JSON line on stdout.
pub async fn run<E, S, R>(
    input: R,
    pool: Arc<EnginePool<E>>,
    store: Arc<S>,
    options: &RunOptions,
    shutdown: impl Future<Output = ()>,
) -> Result<RunSummary, WorkerError>
where
    E: Engine + Send + 'static,
    S: PuzzleStore + Send + Sync + 'static,
    R: AsyncBufRead + Unpin,
{
    let workers = pool.size();
    if workers == 0 {
        return Err(WorkerError::Config("No engines available".into()));
    }

    let semaphore = Arc::new(Semaphore::new(workers));
    let summary = Arc::new(Mutex::new(RunSummary::default()));
    let fatal: Arc<Mutex<Option<WorkerError>>> = Arc::new(Mutex::new(None));

    let mut lines = input.lines();
    let mut line_no = 0usize;
    let mut duplicate_skip = 0usize;
    tokio::pin!(shutdown);

    info!(workers, skip = options.skip, "Starting main loop");

    loop {
        if lock(&fatal).is_some() {
            break;
        }

        let line = tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested, waiting for in-flight games...");
                break;
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            break;
        };

        line_no += 1;
        if line_no <= options.skip || line.trim().is_empty() {
            continue;
        }
        if duplicate_skip > 0 {
            duplicate_skip -= 1;
            lock(&summary).skipped += 1;
            continue;
        }
        lock(&summary).games_read += 1;

        let mut tree = match parse_game_line(&line, options.max_ply) {
            Ok(tree) => tree,
            Err(e) => {
                warn!(line_no, error = %e, "Skipping unreadable game");
                lock(&summary).failed += 1;
                continue;
            }
        };

        let permit = tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested, waiting for in-flight games...");
                break;
            }
            permit = semaphore.clone().acquire_owned() => {
                permit.map_err(|e| WorkerError::Engine(e.to_string()))?
            }
        };

        if lock(&fatal).is_some() {
            break;
        }

        // Best effort: games still in flight are not stored yet and pass this check.
        if store.is_seen_game(tree.id()).await? {
            info!(
                game_id = tree.id(),
                skip = options.duplicate_skip,
                "Game already processed, skipping ahead"
            );
            lock(&summary).skipped += 1;
            duplicate_skip = options.duplicate_skip;
            drop(permit);
            continue;
        }

        let pool = pool.clone();
        let store = store.clone();
        let summary = summary.clone();
        let fatal = fatal.clone();
        let cook = options.cook.clone();

        tokio::spawn(async move {
            let _permit = permit;
            let game_id = tree.id().to_string();
            let Some(mut engine) = pool.checkout() else {
                error!(game_id, "No idle engine despite a free permit");
                lock(&summary).failed += 1;
                return;
            };

            let result = process_game(&mut engine, store.as_ref(), &mut tree, &cook).await;
            pool.checkin(engine);

            match result {
                Ok(records) => {
                    for record in &records {
                        match serde_json::to_string(record) {
                            Ok(json) => println!("{json}"),
                            Err(e) => warn!(game_id, error = %e, "Failed to serialize puzzle"),
                        }
                    }
                    let mut summary = lock(&summary);
                    summary.analyzed += 1;
                    summary.puzzles += records.len();
                    info!(game_id, puzzles = records.len(), "Analysis complete");
                }
                Err(e) if e.is_fatal() => {
                    error!(game_id, error = %e, "Engine failure, stopping run");
                    lock(&summary).failed += 1;
                    lock(&fatal).get_or_insert(e);
                }
                Err(e) => {
                    error!(game_id, error = %e, "Analysis failed");
                    lock(&summary).failed += 1;
                }
            }
        });
    }

    // Acquire all permits = wait for all tasks to complete
    let _all = semaphore
        .acquire_many(workers as u32)
        .await
        .map_err(|e| WorkerError::Engine(e.to_string()))?;

    let summary = *lock(&summary);
    info!(
        games_read = summary.games_read,
        analyzed = summary.analyzed,
        skipped = summary.skipped,
        failed = summary.failed,
        puzzles = summary.puzzles,
        "Run complete"
    );

    let fatal_err = lock(&fatal).take();
    match fatal_err {
        Some(e) => Err(e),
        None => Ok(summary),
    }
}
