use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs the versioned migrations for the current schema.
///
/// Version 1 creates the question bank and the learning score tables.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS questions (
                    id INTEGER NOT NULL,
                    learning_type TEXT NOT NULL,
                    learning_id TEXT NOT NULL,
                    prompt TEXT,
                    option1 TEXT,
                    option2 TEXT,
                    option3 TEXT,
                    option4 TEXT,
                    answer TEXT,
                    question_type TEXT,
                    phase_duration TEXT,
                    PRIMARY KEY (learning_type, learning_id, id)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS learning_scores (
                    id INTEGER PRIMARY KEY,
                    learning_id TEXT NOT NULL,
                    learning_type TEXT NOT NULL,
                    candidate_id INTEGER NOT NULL CHECK (candidate_id >= 0),
                    score INTEGER NOT NULL CHECK (score >= 0),
                    status TEXT NOT NULL CHECK (status IN ('Pass', 'Fail')),
                    answers TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    UNIQUE (learning_id, learning_type, candidate_id)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_learning_scores_candidate
                ON learning_scores (candidate_id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2) ON CONFLICT(version) DO NOTHING",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
