use chrono::{DateTime, Local};
use rusqlite::{params, Connection, Result, Row};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::app_dirs::AppDirs;
use crate::auth::SessionStateProvider;
use crate::session::FinishReport;

/// A finish report as it was kept, with what was practised and when.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedResult {
    pub mode: String,
    pub report: FinishReport,
    pub recorded_at: DateTime<Local>,
}

/// Results kept for signed-in users
#[derive(Debug)]
pub struct ResultStore {
    conn: Connection,
}

impl ResultStore {
    /// Opens the store under the application state directory.
    pub fn open_default() -> Result<Self> {
        let path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("typewise_results.db"));
        Self::open(path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("Failed to create directory: {e}")),
                )
            })?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                mode TEXT NOT NULL,
                wpm INTEGER NOT NULL,
                accuracy INTEGER NOT NULL,
                total_chars INTEGER NOT NULL,
                correct_chars INTEGER NOT NULL,
                errors INTEGER NOT NULL,
                time_spent_secs REAL NOT NULL,
                recorded_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_results_recorded_at ON results(recorded_at)",
            [],
        )?;

        Ok(ResultStore { conn })
    }

    pub fn save(&self, report: &FinishReport, mode: &str) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO results
            (mode, wpm, accuracy, total_chars, correct_chars, errors, time_spent_secs, recorded_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                mode,
                report.wpm,
                report.accuracy,
                report.total_chars as i64,
                report.correct_chars as i64,
                report.errors as i64,
                report.time_spent_secs,
                Local::now().to_rfc3339(),
            ],
        )?;
        info!(mode, wpm = report.wpm, "result saved");
        Ok(())
    }

    /// Saves only for a signed-in user. Returns whether the result was kept.
    pub fn save_if_logged_in(
        &self,
        auth: &dyn SessionStateProvider,
        report: &FinishReport,
        mode: &str,
    ) -> Result<bool> {
        if !auth.is_logged_in() {
            debug!("not signed in, result not saved");
            return Ok(false);
        }
        self.save(report, mode)?;
        Ok(true)
    }

    /// Newest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<SavedResult>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT mode, wpm, accuracy, total_chars, correct_chars, errors, time_spent_secs, recorded_at
            FROM results
            ORDER BY id DESC
            LIMIT ?1
            "#,
        )?;

        let rows = stmt.query_map(params![limit as i64], saved_result_from_row)?;
        rows.collect()
    }

    /// Highest WPM so far; ties go to the better accuracy.
    pub fn personal_best(&self) -> Result<Option<SavedResult>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT mode, wpm, accuracy, total_chars, correct_chars, errors, time_spent_secs, recorded_at
            FROM results
            ORDER BY wpm DESC, accuracy DESC, id ASC
            LIMIT 1
            "#,
        )?;

        let mut rows = stmt.query_map([], saved_result_from_row)?;
        rows.next().transpose()
    }

    pub fn count(&self) -> Result<usize> {
        self.conn
            .query_row("SELECT COUNT(*) FROM results", [], |row| row.get::<_, i64>(0))
            .map(|n| n as usize)
    }
}

fn saved_result_from_row(row: &Row<'_>) -> Result<SavedResult> {
    let recorded_at: String = row.get(7)?;
    let recorded_at = DateTime::parse_from_rfc3339(&recorded_at)
        .map(|dt| dt.with_timezone(&Local))
        .map_err(|_| {
            rusqlite::Error::InvalidColumnType(
                7,
                "recorded_at".to_string(),
                rusqlite::types::Type::Text,
            )
        })?;

    Ok(SavedResult {
        mode: row.get(0)?,
        report: FinishReport {
            wpm: row.get(1)?,
            accuracy: row.get(2)?,
            total_chars: row.get::<_, i64>(3)? as usize,
            correct_chars: row.get::<_, i64>(4)? as usize,
            errors: row.get::<_, i64>(5)? as usize,
            time_spent_secs: row.get(6)?,
        },
        recorded_at,
    })
}
