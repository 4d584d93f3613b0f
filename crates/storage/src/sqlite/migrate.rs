use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
    let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
        .bind(version)
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

/// Applies every pending schema version in order.
///
/// Version 1 creates the learner, content, assessment and progress tables.
/// Version 2 adds the "one in-progress assessment per learner" index.
#[allow(clippy::too_many_lines)]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
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
                CREATE TABLE IF NOT EXISTS learners (
                    id INTEGER PRIMARY KEY,
                    telegram_user_id TEXT NOT NULL UNIQUE,
                    username TEXT,
                    current_level TEXT
                        CHECK (current_level IS NULL
                            OR current_level IN ('A1', 'A2', 'B1', 'B2', 'C1', 'C2')),
                    is_active INTEGER NOT NULL DEFAULT 1 CHECK (is_active IN (0, 1)),
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS assessment_questions (
                    id INTEGER PRIMARY KEY,
                    level TEXT NOT NULL
                        CHECK (level IN ('A1', 'A2', 'B1', 'B2', 'C1', 'C2')),
                    text TEXT NOT NULL,
                    options TEXT NOT NULL,
                    correct_answer INTEGER NOT NULL CHECK (correct_answer >= 0),
                    weight REAL NOT NULL CHECK (weight > 0),
                    skill TEXT
                        CHECK (skill IS NULL
                            OR skill IN ('grammar', 'vocabulary', 'reading', 'listening'))
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS tasks (
                    id INTEGER PRIMARY KEY,
                    level TEXT NOT NULL
                        CHECK (level IN ('A1', 'A2', 'B1', 'B2', 'C1', 'C2')),
                    title TEXT NOT NULL,
                    task_type TEXT NOT NULL CHECK (task_type IN ('text', 'audio', 'video')),
                    body TEXT,
                    media_url TEXT,
                    explanation TEXT,
                    status TEXT NOT NULL CHECK (status IN ('draft', 'published')),
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    CHECK (
                        (task_type = 'text' AND body IS NOT NULL AND media_url IS NULL)
                        OR (task_type <> 'text' AND media_url IS NOT NULL AND body IS NULL)
                    )
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS task_questions (
                    id INTEGER PRIMARY KEY,
                    task_id INTEGER NOT NULL,
                    text TEXT NOT NULL,
                    options TEXT NOT NULL,
                    correct_answer INTEGER NOT NULL CHECK (correct_answer >= 0),
                    weight REAL NOT NULL CHECK (weight > 0),
                    display_order INTEGER NOT NULL CHECK (display_order > 0),
                    FOREIGN KEY (task_id) REFERENCES tasks(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS assessments (
                    id INTEGER PRIMARY KEY,
                    learner_id INTEGER NOT NULL,
                    questions TEXT NOT NULL,
                    answers TEXT NOT NULL,
                    status TEXT NOT NULL
                        CHECK (status IN ('in_progress', 'completed', 'abandoned')),
                    score REAL NOT NULL DEFAULT 0 CHECK (score >= 0 AND score <= 1),
                    resulting_level TEXT
                        CHECK (resulting_level IS NULL
                            OR resulting_level IN ('A1', 'A2', 'B1', 'B2', 'C1', 'C2')),
                    started_at TEXT NOT NULL,
                    completed_at TEXT,
                    CHECK ((status = 'completed') = (completed_at IS NOT NULL)),
                    FOREIGN KEY (learner_id) REFERENCES learners(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS task_progress (
                    learner_id INTEGER NOT NULL,
                    task_id INTEGER NOT NULL,
                    answers TEXT NOT NULL,
                    score REAL NOT NULL CHECK (score >= 0),
                    percentage_correct REAL NOT NULL
                        CHECK (percentage_correct >= 0 AND percentage_correct <= 100),
                    completed_at TEXT NOT NULL,
                    time_taken_secs REAL CHECK (time_taken_secs IS NULL OR time_taken_secs >= 0),
                    PRIMARY KEY (learner_id, task_id),
                    FOREIGN KEY (learner_id) REFERENCES learners(id) ON DELETE CASCADE,
                    FOREIGN KEY (task_id) REFERENCES tasks(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_tasks_status_level
                    ON tasks (status, level, id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_task_questions_task_order
                    ON task_questions (task_id, display_order, id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_assessment_questions_level
                    ON assessment_questions (level, id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_task_progress_learner_completed
                    ON task_progress (learner_id, completed_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        mark_applied(&mut tx, 1).await?;
        tx.commit().await?;
    }

    if !is_applied(pool, 2).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE UNIQUE INDEX IF NOT EXISTS idx_assessments_one_in_progress
                    ON assessments (learner_id)
                    WHERE status = 'in_progress';
            ",
        )
        .execute(&mut *tx)
        .await?;

        mark_applied(&mut tx, 2).await?;
        tx.commit().await?;
    }

    Ok(())
}

async fn mark_applied(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    version: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r"
            INSERT INTO schema_migrations (version, applied_at)
            VALUES (?1, ?2)
            ON CONFLICT(version) DO NOTHING
        ",
    )
    .bind(version)
    .bind(Utc::now())
    .execute(&mut **tx)
    .await?;
    Ok(())
}
