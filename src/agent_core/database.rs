//! SQLite database for per-thread conversation snapshots.
//!
//! Uses `rusqlite` in synchronous mode; callers hold it behind a mutex.
//! WAL mode is enabled so an external reader can inspect snapshots while the
//! assistant is running.

use rusqlite::{params, Connection, OptionalExtension};

use super::errors::AgentError;

// ─── Types ──────────────────────────────────────────────────────────────────

/// A stored snapshot row. `state` is the serialized `ConversationState`.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSnapshot {
    pub thread_id: String,
    pub state: String,
    pub turn_count: u64,
    pub updated_at: String,
}

// ─── Database ───────────────────────────────────────────────────────────────

/// SQLite database handle for the agent core.
pub struct AgentDatabase {
    conn: Connection,
}

impl AgentDatabase {
    /// Open (or create) the agent database at the given path.
    ///
    /// Pass `":memory:"` for an in-memory database (tests).
    pub fn open(path: &str) -> Result<Self, AgentError> {
        let conn = Connection::open(path)?;

        // Enable WAL mode for concurrent reads
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        let db = Self { conn };
        db.create_tables()?;
        Ok(db)
    }

    /// Create all required tables if they don't exist.
    fn create_tables(&self) -> Result<(), AgentError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS thread_snapshots (
                thread_id TEXT PRIMARY KEY,
                state TEXT NOT NULL,
                turn_count INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            ",
        )?;
        Ok(())
    }

    // ─── Snapshots ──────────────────────────────────────────────────────

    /// Write the snapshot for a thread, replacing any previous one.
    pub fn save_snapshot(
        &self,
        thread_id: &str,
        state_json: &str,
        turn_count: u64,
    ) -> Result<(), AgentError> {
        let turn_count = i64::try_from(turn_count).map_err(|e| AgentError::SerializationError {
            reason: format!("turn_count out of range: {e}"),
        })?;
        self.conn.execute(
            "INSERT INTO thread_snapshots (thread_id, state, turn_count, updated_at)
             VALUES (?1, ?2, ?3, datetime('now'))
             ON CONFLICT(thread_id) DO UPDATE SET
                state = excluded.state,
                turn_count = excluded.turn_count,
                updated_at = excluded.updated_at",
            params![thread_id, state_json, turn_count],
        )?;
        Ok(())
    }

    /// Load the snapshot for a thread, if one exists.
    pub fn load_snapshot(&self, thread_id: &str) -> Result<Option<StoredSnapshot>, AgentError> {
        let result = self
            .conn
            .query_row(
                "SELECT thread_id, state, turn_count, updated_at
                 FROM thread_snapshots WHERE thread_id = ?1",
                params![thread_id],
                |row| {
                    Ok(StoredSnapshot {
                        thread_id: row.get(0)?,
                        state: row.get(1)?,
                        turn_count: row.get::<_, i64>(2)?.max(0) as u64,
                        updated_at: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(result)
    }

    /// Remove a thread's snapshot. Returns whether one existed.
    pub fn delete_snapshot(&self, thread_id: &str) -> Result<bool, AgentError> {
        let deleted = self.conn.execute(
            "DELETE FROM thread_snapshots WHERE thread_id = ?1",
            params![thread_id],
        )?;
        Ok(deleted > 0)
    }

    /// All thread ids with a snapshot, most recently updated first.
    pub fn list_threads(&self) -> Result<Vec<String>, AgentError> {
        let mut stmt = self.conn.prepare(
            "SELECT thread_id FROM thread_snapshots ORDER BY updated_at DESC, thread_id ASC",
        )?;
        let rows = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(rows)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
