//! Postgres-backed puzzle store

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use puzzle_cooker::{CookError, PuzzleRecord, PuzzleStore};

use crate::error::WorkerError;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect and create the tables if they are missing.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, WorkerError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(std::time::Duration::from_secs(10))
            .idle_timeout(std::time::Duration::from_secs(300))
            .connect(database_url)
            .await?;
        info!(max_connections, "Database connection pool established");

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    pub async fn ensure_schema(&self) -> Result<(), WorkerError> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS generated_puzzles (
                id BIGSERIAL PRIMARY KEY,
                game_id TEXT NOT NULL,
                fen TEXT NOT NULL,
                ply INTEGER NOT NULL,
                moves TEXT[] NOT NULL,
                cp INTEGER NOT NULL,
                generator_version INTEGER NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS generated_puzzles_game_id_idx ON generated_puzzles (game_id)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE TABLE IF NOT EXISTS seen_positions (fen TEXT PRIMARY KEY)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

fn store_error(e: sqlx::Error) -> CookError {
    CookError::Store(e.to_string())
}

impl PuzzleStore for PgStore {
    async fn is_seen_game(&self, game_id: &str) -> Result<bool, CookError> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM generated_puzzles WHERE game_id = $1 LIMIT 1")
                .bind(game_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(store_error)?;
        Ok(row.is_some())
    }

    async fn is_seen_position(&self, key: &str) -> Result<bool, CookError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT fen FROM seen_positions WHERE fen = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(row.is_some())
    }

    async fn mark_seen_position(&self, key: &str) -> Result<(), CookError> {
        sqlx::query("INSERT INTO seen_positions (fen) VALUES ($1) ON CONFLICT DO NOTHING")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn store_puzzle(&self, record: &PuzzleRecord) -> Result<(), CookError> {
        sqlx::query(
            r#"INSERT INTO generated_puzzles (game_id, fen, ply, moves, cp, generator_version)
            VALUES ($1, $2, $3, $4, $5, $6)"#,
        )
        .bind(&record.game_id)
        .bind(&record.fen)
        .bind(i32::try_from(record.ply).unwrap_or(i32::MAX))
        .bind(&record.moves)
        .bind(record.cp)
        .bind(record.generator_version)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(())
    }
}
