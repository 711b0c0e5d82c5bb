use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs the versioned migrations for the course schema.
///
/// Version 1 creates courses, modules, lessons, materials, enrollments and
/// quiz results together with their lookup indexes.
#[allow(clippy::too_many_lines)]
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

    if is_applied(pool, 1).await? {
        return Ok(());
    }

    let mut tx = pool.begin().await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS courses (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    // Tree ids repeat across courses, so each level is keyed by its slot.
    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS course_modules (
                course_id INTEGER NOT NULL,
                position INTEGER NOT NULL CHECK (position >= 0),
                id INTEGER NOT NULL,
                title TEXT NOT NULL,
                PRIMARY KEY (course_id, position),
                FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS lessons (
                course_id INTEGER NOT NULL,
                module_position INTEGER NOT NULL,
                position INTEGER NOT NULL CHECK (position >= 0),
                id INTEGER NOT NULL,
                name TEXT NOT NULL,
                description TEXT,
                PRIMARY KEY (course_id, module_position, position),
                FOREIGN KEY (course_id, module_position)
                    REFERENCES course_modules(course_id, position) ON DELETE CASCADE
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS materials (
                course_id INTEGER NOT NULL,
                module_position INTEGER NOT NULL,
                lesson_position INTEGER NOT NULL,
                position INTEGER NOT NULL CHECK (position >= 0),
                id INTEGER NOT NULL,
                kind TEXT NOT NULL,
                title TEXT NOT NULL,
                order_index INTEGER NOT NULL,
                duration REAL NOT NULL CHECK (duration >= 0),
                details TEXT NOT NULL,
                PRIMARY KEY (course_id, module_position, lesson_position, position),
                FOREIGN KEY (course_id, module_position, lesson_position)
                    REFERENCES lessons(course_id, module_position, position) ON DELETE CASCADE
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS enrollments (
                course_id INTEGER NOT NULL,
                learner_id INTEGER NOT NULL,
                current_material INTEGER,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (course_id, learner_id),
                FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS quiz_results (
                course_id INTEGER NOT NULL,
                learner_id INTEGER NOT NULL,
                material_id INTEGER NOT NULL,
                score REAL NOT NULL,
                recorded_at TEXT NOT NULL,
                PRIMARY KEY (course_id, learner_id, material_id),
                FOREIGN KEY (course_id, learner_id)
                    REFERENCES enrollments(course_id, learner_id) ON DELETE CASCADE
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE INDEX IF NOT EXISTS idx_materials_course_id
                ON materials (course_id, id);
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            INSERT INTO schema_migrations (version, applied_at)
            VALUES (?1, ?2)
            ON CONFLICT(version) DO NOTHING
        ",
    )
    .bind(1_i64)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    tracing::info!(version = 1, "applied course schema migration");

    Ok(())
}
