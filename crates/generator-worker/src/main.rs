//! Puzzle generator worker
//!
//! Reads `id;fen;moves` game lines from a file, screens every game with a
//! pool of UCI engines and stores the puzzles found.

use std::sync::Arc;

use tokio::fs::File;
use tokio::io::BufReader;
use tracing::{info, warn};

use generator_worker::db::PgStore;
use generator_worker::uci::UciEngine;
use generator_worker::{run, Args, EnginePool, RunOptions, WorkerConfig};
use puzzle_cooker::{MemoryStore, PuzzleStore};

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

async fn run_with_store<S>(
    args: &Args,
    config: &WorkerConfig,
    store: Arc<S>,
) -> anyhow::Result<()>
where
    S: PuzzleStore + Send + Sync + 'static,
{
    info!(workers = config.workers, engine_path = %config.engine_path, "Creating engine pool");
    let mut engines = Vec::with_capacity(config.workers);
    for i in 0..config.workers {
        let engine =
            UciEngine::spawn(&config.engine_path, config.engine_threads, config.engine_hash_mb)
                .await?;
        info!(engine_id = i, "Engine ready");
        engines.push(engine);
    }
    let pool = Arc::new(EnginePool::new(engines));

    let input = BufReader::new(File::open(&args.file).await?);
    let options = RunOptions {
        skip: args.skip,
        duplicate_skip: config.duplicate_skip,
        max_ply: config.max_ply,
        cook: config.cook_config(),
    };

    let result = run(input, pool.clone(), store, &options, shutdown_signal()).await;

    info!("Shutting down engines");
    for mut engine in pool.drain() {
        engine.quit().await;
    }

    let summary = result?;
    info!(?summary, "Done");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file for local dev
    let _ = dotenvy::dotenv();

    let args = Args::parse()?;

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    // Stdout carries the puzzle records.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    let config = WorkerConfig::load()?;
    info!(file = %args.file.display(), dry_run = args.dry_run, "Worker config loaded");

    if args.dry_run {
        run_with_store(&args, &config, Arc::new(MemoryStore::new())).await
    } else {
        let store = PgStore::connect(config.database_url()?, config.workers as u32 + 2).await?;
        run_with_store(&args, &config, Arc::new(store)).await
    }
}
