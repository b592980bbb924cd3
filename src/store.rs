//! Persistent store: grade and upload rows over sqlx/SQLite.
//!
//! ## Transaction discipline
//!
//! One ingestion run owns exactly one [`sqlx::Transaction`], obtained via
//! [`GradeStore::begin`]. Everything the run writes — the upload record and
//! all grade rows — commits together or not at all; a dropped transaction
//! rolls back, so every early-return error path tears down cleanly without
//! explicit rollback calls.
//!
//! ## Duplicate handling
//!
//! `(owner_id, course_code, semester)` carries a UNIQUE index and inserts use
//! `ON CONFLICT ... DO NOTHING`. The pipeline still pre-checks with
//! [`GradeStore::grade_exists`] to keep duplicate counts accurate, but a race
//! between two concurrent runs can no longer produce duplicate rows: the
//! loser's insert affects zero rows and is counted as one more skip.

use crate::error::GradeScanError;
use crate::output::DeleteOutcome;
use crate::pipeline::normalize::NormalizedSubject;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

/// One persisted course result.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, serde::Serialize)]
pub struct GradeRow {
    pub id: String,
    pub owner_id: String,
    pub course_code: String,
    pub course_name: String,
    pub credits: i64,
    pub letter_grade: String,
    pub semester: i64,
    pub grade_points: f64,
    pub created_at: DateTime<Utc>,
}

/// One ingestion attempt / audit record.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, serde::Serialize)]
pub struct UploadRow {
    pub id: String,
    pub owner_id: String,
    pub filename: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Handle to the grades database.
#[derive(Clone)]
pub struct GradeStore {
    pool: SqlitePool,
}

impl GradeStore {
    /// Open (and create if missing) a database at `path`, then run schema setup.
    pub async fn open(path: &str) -> Result<Self, GradeScanError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// In-memory database, for tests and ephemeral runs.
    ///
    /// Pinned to a single connection: each SQLite `:memory:` connection is
    /// its own database, so a wider pool would scatter tables across them.
    pub async fn open_in_memory() -> Result<Self, GradeScanError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), GradeScanError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS grades (
                id           TEXT PRIMARY KEY,
                owner_id     TEXT NOT NULL,
                course_code  TEXT NOT NULL,
                course_name  TEXT NOT NULL,
                credits      INTEGER NOT NULL CHECK (credits BETWEEN 1 AND 6),
                letter_grade TEXT NOT NULL,
                semester     INTEGER NOT NULL CHECK (semester BETWEEN 1 AND 12),
                grade_points REAL NOT NULL CHECK (grade_points BETWEEN 0.0 AND 10.0),
                created_at   TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_grades_dedup
             ON grades (owner_id, course_code, semester)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS grade_uploads (
                id         TEXT PRIMARY KEY,
                owner_id   TEXT NOT NULL,
                filename   TEXT NOT NULL,
                status     TEXT NOT NULL DEFAULT 'processing',
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        debug!("database schema ready");
        Ok(())
    }

    /// Begin the transaction scoping one ingestion run.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, GradeScanError> {
        Ok(self.pool.begin().await?)
    }

    // ── Transaction-scoped writes ───────────────────────────────────────

    /// Create the upload audit record with status `processing`.
    pub async fn create_upload(
        conn: &mut SqliteConnection,
        owner_id: &str,
        filename: &str,
    ) -> Result<UploadRow, GradeScanError> {
        let row = UploadRow {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            filename: filename.to_string(),
            status: "processing".to_string(),
            created_at: Utc::now(),
        };
        sqlx::query(
            "INSERT INTO grade_uploads (id, owner_id, filename, status, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&row.id)
        .bind(&row.owner_id)
        .bind(&row.filename)
        .bind(&row.status)
        .bind(row.created_at)
        .execute(conn)
        .await?;
        Ok(row)
    }

    /// Set the terminal status on an upload record.
    pub async fn finalize_upload(
        conn: &mut SqliteConnection,
        upload_id: &str,
        status: &str,
    ) -> Result<(), GradeScanError> {
        sqlx::query("UPDATE grade_uploads SET status = ? WHERE id = ?")
            .bind(status)
            .bind(upload_id)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Whether a grade already exists for the dedup key.
    pub async fn grade_exists(
        conn: &mut SqliteConnection,
        owner_id: &str,
        course_code: &str,
        semester: i64,
    ) -> Result<bool, GradeScanError> {
        let found: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM grades WHERE owner_id = ? AND course_code = ? AND semester = ?",
        )
        .bind(owner_id)
        .bind(course_code)
        .bind(semester)
        .fetch_optional(conn)
        .await?;
        Ok(found.is_some())
    }

    /// Insert a normalised subject as a grade row.
    ///
    /// Returns the new row id, or `None` when the dedup key already exists
    /// (conflict-aware insert: a lost race is a skip, not an error).
    pub async fn insert_grade(
        conn: &mut SqliteConnection,
        owner_id: &str,
        semester: i64,
        subject: &NormalizedSubject,
    ) -> Result<Option<String>, GradeScanError> {
        let id = Uuid::new_v4().to_string();
        let result = sqlx::query(
            r#"
            INSERT INTO grades
            (id, owner_id, course_code, course_name, credits, letter_grade, semester, grade_points, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (owner_id, course_code, semester) DO NOTHING
            "#,
        )
        .bind(&id)
        .bind(owner_id)
        .bind(&subject.course_code)
        .bind(&subject.course_name)
        .bind(subject.credits)
        .bind(&subject.letter_grade)
        .bind(semester)
        .bind(subject.grade_points)
        .bind(Utc::now())
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            Ok(None)
        } else {
            Ok(Some(id))
        }
    }

    // ── Reads ───────────────────────────────────────────────────────────

    /// All grade rows for an owner, ordered by semester then course code.
    pub async fn grades_for_owner(&self, owner_id: &str) -> Result<Vec<GradeRow>, GradeScanError> {
        let rows = sqlx::query_as::<_, GradeRow>(
            "SELECT * FROM grades WHERE owner_id = ? ORDER BY semester, course_code",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Grade rows for one owner and semester, ordered by course code.
    pub async fn grades_for_semester(
        &self,
        owner_id: &str,
        semester: i64,
    ) -> Result<Vec<GradeRow>, GradeScanError> {
        let rows = sqlx::query_as::<_, GradeRow>(
            "SELECT * FROM grades WHERE owner_id = ? AND semester = ? ORDER BY course_code",
        )
        .bind(owner_id)
        .bind(semester)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Upload audit records for an owner, newest first.
    pub async fn uploads_for_owner(
        &self,
        owner_id: &str,
    ) -> Result<Vec<UploadRow>, GradeScanError> {
        let rows = sqlx::query_as::<_, UploadRow>(
            "SELECT * FROM grade_uploads WHERE owner_id = ? ORDER BY created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // ── Deletes (idempotent, with counts) ───────────────────────────────

    /// Remove every grade and upload record for an owner.
    pub async fn delete_all_for_owner(
        &self,
        owner_id: &str,
    ) -> Result<DeleteOutcome, GradeScanError> {
        let mut tx = self.begin().await?;
        let grades = sqlx::query("DELETE FROM grades WHERE owner_id = ?")
            .bind(owner_id)
            .execute(tx.as_mut())
            .await?
            .rows_affected();
        let uploads = sqlx::query("DELETE FROM grade_uploads WHERE owner_id = ?")
            .bind(owner_id)
            .execute(tx.as_mut())
            .await?
            .rows_affected();
        tx.commit().await?;
        info!(owner_id, grades, uploads, "deleted all owner data");
        Ok(DeleteOutcome {
            deleted_grades: grades,
            deleted_uploads: uploads,
        })
    }

    /// Remove the grades of one semester. Upload records are not
    /// semester-scoped and are left untouched.
    pub async fn delete_semester(
        &self,
        owner_id: &str,
        semester: i64,
    ) -> Result<DeleteOutcome, GradeScanError> {
        let grades = sqlx::query("DELETE FROM grades WHERE owner_id = ? AND semester = ?")
            .bind(owner_id)
            .bind(semester)
            .execute(&self.pool)
            .await?
            .rows_affected();
        info!(owner_id, semester, grades, "deleted semester grades");
        Ok(DeleteOutcome {
            deleted_grades: grades,
            deleted_uploads: 0,
        })
    }

    /// Remove one upload audit record (the owner scope prevents deleting
    /// someone else's record by guessed id).
    pub async fn delete_upload(
        &self,
        owner_id: &str,
        upload_id: &str,
    ) -> Result<DeleteOutcome, GradeScanError> {
        let uploads = sqlx::query("DELETE FROM grade_uploads WHERE owner_id = ? AND id = ?")
            .bind(owner_id)
            .bind(upload_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(DeleteOutcome {
            deleted_grades: 0,
            deleted_uploads: uploads,
        })
    }
}
