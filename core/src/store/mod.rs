//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! Pipeline code goes through the source and sink traits; it never
//! executes SQL directly.

use crate::{
    error::{MatchError, MatchResult},
    event::EventLogEntry,
};
use rusqlite::{params, Connection, OptionalExtension};

mod assignment;
mod workforce;

pub struct MatchStore {
    conn: Connection,
}

impl MatchStore {
    pub fn open(path: &str) -> MatchResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> MatchResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order. Idempotent.
    pub fn migrate(&self) -> MatchResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_workforce.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/003_assignment.sql"))?;
        Ok(())
    }

    // ── Run ────────────────────────────────────────────────────

    pub fn insert_run(&self, run_id: &str, seed: u64, version: &str, today: &str) -> MatchResult<()> {
        self.conn.execute(
            "INSERT INTO run (run_id, seed, version, today) VALUES (?1, ?2, ?3, ?4)",
            params![run_id, seed as i64, version, today],
        )?;
        Ok(())
    }

    pub fn run_exists(&self, run_id: &str) -> MatchResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row("SELECT 1 FROM run WHERE run_id = ?1", params![run_id], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(found.is_some())
    }

    pub fn run_finished(&self, run_id: &str) -> MatchResult<bool> {
        let finished: Option<i64> = self
            .conn
            .query_row(
                "SELECT finished FROM run WHERE run_id = ?1",
                params![run_id],
                |row| row.get(0),
            )
            .optional()?;
        finished
            .map(|f| f != 0)
            .ok_or_else(|| MatchError::RunNotInitialized {
                run_id: run_id.to_string(),
            })
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, entry: &EventLogEntry) -> MatchResult<()> {
        append_event_on(&self.conn, entry)
    }

    pub fn events_for_run(&self, run_id: &str) -> MatchResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, run_id, seq, stage, event_type, payload
             FROM event_log WHERE run_id = ?1
             ORDER BY seq ASC, id ASC",
        )?;
        let entries = stmt
            .query_map(params![run_id], |row| {
                Ok(EventLogEntry {
                    id: Some(row.get(0)?),
                    run_id: row.get(1)?,
                    seq: row.get::<_, i64>(2)? as u64,
                    stage: row.get(3)?,
                    event_type: row.get(4)?,
                    payload: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn event_count(&self, run_id: &str) -> MatchResult<i64> {
        let n = self.conn.query_row(
            "SELECT COUNT(*) FROM event_log WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(n)
    }
}

/// Shared by `append_event` and the sink's transaction.
fn append_event_on(conn: &Connection, entry: &EventLogEntry) -> MatchResult<()> {
    conn.execute(
        "INSERT INTO event_log (run_id, seq, stage, event_type, payload)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            entry.run_id,
            entry.seq as i64,
            entry.stage,
            entry.event_type,
            entry.payload,
        ],
    )?;
    Ok(())
}
