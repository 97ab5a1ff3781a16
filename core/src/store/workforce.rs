use super::MatchStore;
use crate::{
    error::{MatchError, MatchResult},
    ingest::{EmployeeRecord, RawSkillEntry, TaskRecord},
    source::{EmployeeSource, JsonDataset, TaskSource},
};
use rusqlite::{params, Connection};

impl MatchStore {
    // ── Employees ─────────────────────────────────────────────────

    pub fn insert_employee(&self, record: &EmployeeRecord) -> MatchResult<()> {
        insert_employee_on(&self.conn, record)
    }

    pub fn employee_records(&self) -> MatchResult<Vec<EmployeeRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT employee_id, skills_json, active, tenure_days
             FROM employee ORDER BY employee_id ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i32>(2)? != 0,
                    row.get::<_, Option<i64>>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .map(|(id, skills_json, active, tenure_days)| EmployeeRecord {
                skills: decode_skills(&skills_json),
                id,
                active,
                tenure_days,
            })
            .collect())
    }

    // ── Tasks ─────────────────────────────────────────────────────

    pub fn insert_task(&self, record: &TaskRecord) -> MatchResult<()> {
        insert_task_on(&self.conn, record)
    }

    pub fn task_records(&self) -> MatchResult<Vec<TaskRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT task_id, task_key, project, skills_json, text, status, issue_type,
                    date, estimated_hours, actual_hours, assignee
             FROM task ORDER BY task_id ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(3)?,
                    TaskRecord {
                        id: row.get(0)?,
                        key: row.get(1)?,
                        project: row.get(2)?,
                        skills: Vec::new(),
                        text: row.get(4)?,
                        status: row.get(5)?,
                        issue_type: row.get(6)?,
                        date: row.get(7)?,
                        estimated_hours: row.get(8)?,
                        actual_hours: row.get(9)?,
                        assignee: row.get(10)?,
                    },
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .map(|(skills_json, mut record)| {
                record.skills = decode_skills(&skills_json);
                record
            })
            .collect())
    }

    /// Load a whole dataset atomically.
    pub fn seed_dataset(&self, dataset: &JsonDataset) -> MatchResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        for e in &dataset.employees {
            insert_employee_on(&tx, e)?;
        }
        for t in &dataset.tasks {
            insert_task_on(&tx, t)?;
        }
        tx.commit()?;
        log::debug!(
            "seeded {} employees, {} tasks",
            dataset.employees.len(),
            dataset.tasks.len()
        );
        Ok(())
    }
}

fn insert_employee_on(conn: &Connection, record: &EmployeeRecord) -> MatchResult<()> {
    conn.execute(
        "INSERT INTO employee (employee_id, skills_json, active, tenure_days)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            record.id,
            serde_json::to_string(&record.skills)?,
            record.active as i32,
            record.tenure_days,
        ],
    )?;
    Ok(())
}

fn insert_task_on(conn: &Connection, record: &TaskRecord) -> MatchResult<()> {
    conn.execute(
        "INSERT INTO task (task_id, task_key, project, skills_json, text, status, issue_type,
                           date, estimated_hours, actual_hours, assignee)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            record.id,
            record.key,
            record.project,
            serde_json::to_string(&record.skills)?,
            record.text,
            record.status,
            record.issue_type,
            record.date,
            record.estimated_hours,
            record.actual_hours,
            record.assignee,
        ],
    )?;
    Ok(())
}

/// A skills column that is not a JSON array at all yields one unrecognized
/// entry, so the owning record survives and the entry is reported downstream.
fn decode_skills(raw: &str) -> Vec<RawSkillEntry> {
    serde_json::from_str::<Vec<RawSkillEntry>>(raw).unwrap_or_else(|_| {
        vec![RawSkillEntry::Unrecognized(serde_json::Value::String(
            raw.to_string(),
        ))]
    })
}

fn as_upstream(err: MatchError) -> MatchError {
    MatchError::UpstreamSource {
        source_name: "sqlite".into(),
        reason: err.to_string(),
    }
}

impl TaskSource for MatchStore {
    fn source_name(&self) -> &str {
        "sqlite"
    }

    fn fetch_tasks(&self) -> MatchResult<Vec<TaskRecord>> {
        self.task_records().map_err(as_upstream)
    }
}

impl EmployeeSource for MatchStore {
    fn source_name(&self) -> &str {
        "sqlite"
    }

    fn fetch_employees(&self) -> MatchResult<Vec<EmployeeRecord>> {
        self.employee_records().map_err(as_upstream)
    }
}
