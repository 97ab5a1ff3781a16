use super::{append_event_on, MatchStore};
use crate::{
    engine::RunOutput,
    error::{MatchError, MatchResult},
    event::EventLogEntry,
    ingest::RawSkillEntry,
    model::{CandidateResult, SkillRecord},
    source::AssignmentSink,
    types::TaskId,
};
use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};

impl AssignmentSink for MatchStore {
    /// Writes the whole run in one transaction. Any failure rolls back
    /// everything, including the event log.
    fn persist(&self, output: &RunOutput) -> MatchResult<()> {
        if !self.run_exists(&output.run_id)? {
            return Err(MatchError::RunNotInitialized {
                run_id: output.run_id.clone(),
            });
        }
        let run_id = output.run_id.as_str();
        let tx = self.conn.unchecked_transaction()?;

        // ── Replacement skill sets ──────────────────────────
        for update in &output.skill_updates {
            let raw: Vec<RawSkillEntry> = update.skills.iter().map(RawSkillEntry::from).collect();
            tx.execute(
                "INSERT INTO employee (employee_id, skills_json, active, tenure_days)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(employee_id) DO UPDATE SET
                    skills_json = excluded.skills_json,
                    active      = excluded.active,
                    tenure_days = excluded.tenure_days",
                params![
                    update.employee_id,
                    serde_json::to_string(&raw)?,
                    update.active as i32,
                    update.tenure_days,
                ],
            )?;
            tx.execute(
                "DELETE FROM employee_skill WHERE employee_id = ?1",
                params![update.employee_id],
            )?;
            for skill in &update.skills {
                tx.execute(
                    "INSERT INTO employee_skill (employee_id, skill, level, updated_at, run_id)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        update.employee_id,
                        skill.name,
                        skill.level,
                        skill.updated_at.map(|d| d.to_string()),
                        run_id,
                    ],
                )?;
            }
        }

        // ── Candidates ──────────────────────────────────────
        for assignment in &output.assignments {
            tx.execute(
                "DELETE FROM candidate WHERE task_id = ?1",
                params![assignment.task_id],
            )?;
            for c in &assignment.candidates {
                tx.execute(
                    "INSERT INTO candidate (task_id, employee_id, rank, score, accepted, run_id)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        assignment.task_id,
                        c.employee_id,
                        c.rank as i64,
                        c.score,
                        c.accepted as i32,
                        run_id,
                    ],
                )?;
            }
            tx.execute(
                "UPDATE task SET assignee_in_candidates = ?1 WHERE task_id = ?2",
                params![assignment.assignee_in_candidates as i32, assignment.task_id],
            )?;
        }

        // ── Estimates ───────────────────────────────────────
        for e in &output.estimates {
            tx.execute(
                "INSERT OR REPLACE INTO task_estimate
                    (task_id, estimated_hours, actual_hours, well_estimated, run_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    e.task_id,
                    e.estimated_hours,
                    e.actual_hours,
                    e.well_estimated.map(|b| b as i32),
                    run_id,
                ],
            )?;
            tx.execute(
                "UPDATE task SET estimated_hours = COALESCE(estimated_hours, ?1)
                 WHERE task_id = ?2",
                params![e.estimated_hours, e.task_id],
            )?;
        }

        // ── Event log ───────────────────────────────────────
        for (seq, event) in output.events.iter().enumerate() {
            append_event_on(&tx, &EventLogEntry::from_event(run_id, seq as u64, event)?)?;
        }

        tx.execute("UPDATE run SET finished = 1 WHERE run_id = ?1", params![run_id])?;
        tx.commit()?;
        log::debug!(
            "persisted run {run_id}: {} skill sets, {} assignments, {} events",
            output.skill_updates.len(),
            output.assignments.len(),
            output.events.len()
        );
        Ok(())
    }
}

impl MatchStore {
    pub fn candidates_for_task(&self, task_id: TaskId) -> MatchResult<Vec<CandidateResult>> {
        let mut stmt = self.conn.prepare(
            "SELECT employee_id, score, rank, accepted FROM candidate
             WHERE task_id = ?1 ORDER BY rank ASC",
        )?;
        let rows = stmt.query_map(params![task_id], |row| {
            Ok(CandidateResult {
                employee_id: row.get(0)?,
                score: row.get(1)?,
                rank: row.get::<_, i64>(2)? as usize,
                accepted: row.get::<_, i32>(3)? != 0,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn employee_skills(&self, employee_id: &str) -> MatchResult<Vec<SkillRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT skill, level, updated_at FROM employee_skill
             WHERE employee_id = ?1 ORDER BY skill ASC",
        )?;
        let rows = stmt.query_map(params![employee_id], |row| {
            let updated_at: Option<String> = row.get(2)?;
            Ok(SkillRecord {
                name: row.get(0)?,
                level: row.get(1)?,
                updated_at: updated_at
                    .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn employee_active(&self, employee_id: &str) -> MatchResult<Option<bool>> {
        let active: Option<i32> = self
            .conn
            .query_row(
                "SELECT active FROM employee WHERE employee_id = ?1",
                params![employee_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(active.map(|a| a != 0))
    }

    /// `None` until a run has assigned the task.
    pub fn assignee_in_candidates(&self, task_id: TaskId) -> MatchResult<Option<bool>> {
        let flag: Option<Option<i32>> = self
            .conn
            .query_row(
                "SELECT assignee_in_candidates FROM task WHERE task_id = ?1",
                params![task_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(flag.flatten().map(|f| f != 0))
    }

    pub fn estimated_hours(&self, task_id: TaskId) -> MatchResult<Option<f64>> {
        let hours: Option<Option<f64>> = self
            .conn
            .query_row(
                "SELECT estimated_hours FROM task WHERE task_id = ?1",
                params![task_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(hours.flatten())
    }

    pub fn candidate_count(&self) -> MatchResult<i64> {
        let n = self
            .conn
            .query_row("SELECT COUNT(*) FROM candidate", [], |row| row.get(0))?;
        Ok(n)
    }
}
