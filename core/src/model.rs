//! Normalized domain entities.
//!
//! Everything downstream of `ingest` works on these types only.
//! Raw tracker encodings never leak past the ingestion boundary.

use crate::types::{EmployeeId, MonthKey, TaskId};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub const STATUS_RESOLVED: &str = "Resolved";
pub const STATUS_CLOSED: &str = "Closed";
pub const STATUS_TODO: &str = "To Do";
pub const ISSUE_TYPE_SUBTASK: &str = "Sub-task";

/// One proficiency entry on an employee. `level` is always within [1, 10].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillRecord {
    pub name: String,
    pub level: f64,
    pub updated_at: Option<NaiveDate>,
}

/// One minimum-level requirement declared by a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillRequirement {
    pub name: String,
    pub required_level: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub skills: Vec<SkillRecord>,
    pub tenure_days: i64,
    pub active: bool,
}

impl Employee {
    pub fn skill(&self, name: &str) -> Option<&SkillRecord> {
        self.skills.iter().find(|s| s.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub key: String,
    pub project: Option<String>,
    pub requirements: Vec<SkillRequirement>,
    pub text: String,
    pub status: String,
    pub issue_type: String,
    pub date: Option<NaiveDateTime>,
    pub estimated_hours: Option<f64>,
    /// Hours actually logged against the task, when the tracker has them.
    pub actual_hours: Option<f64>,
    /// The employee the tracker recorded as assignee.
    pub assignee: Option<EmployeeId>,
}

impl Task {
    /// Ledger bucket for this task. `None` for undated tasks.
    pub fn month_key(&self) -> Option<MonthKey> {
        self.date.map(|d| MonthKey::from_date(d.date()))
    }

    pub fn is_todo(&self) -> bool {
        self.status == STATUS_TODO
    }
}

/// One accepted (or, in event payloads, rejected) candidate for a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResult {
    pub employee_id: EmployeeId,
    pub score: f64,
    /// 1-based position in the score ranking.
    pub rank: usize,
    pub accepted: bool,
}

/// Selector output for a single dated task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskAssignment {
    pub task_id: TaskId,
    pub task_key: String,
    pub month_key: MonthKey,
    pub candidates: Vec<CandidateResult>,
    pub assignee_in_candidates: bool,
}

/// Replacement skill set for one employee, handed to the sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeSkillUpdate {
    pub employee_id: EmployeeId,
    pub skills: Vec<SkillRecord>,
    pub tenure_days: i64,
    pub active: bool,
}
