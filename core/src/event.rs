//! The match event log.
//!
//! Every decision the pipeline takes is recorded as a `MatchEvent`, in the
//! order it was taken. Two runs over the same data with the same seed must
//! produce identical logs.

use crate::types::{EmployeeId, MonthKey, RunId, TaskId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatchEvent {
    // ── Engine ─────────────────────────────────────
    RunInitialized {
        run_id: RunId,
        seed: u64,
        today: String,
    },
    RunCompleted {
        run_id: RunId,
        tasks_assigned: usize,
        tasks_skipped: usize,
        candidates_accepted: usize,
    },

    // ── Ingestion ──────────────────────────────────
    RecordIssue {
        owner: String,
        kind: String, // "data_gap" | "malformed_record"
        detail: String,
    },

    // ── Proficiency ────────────────────────────────
    SkillLevelsRecomputed {
        employee_id: EmployeeId,
        skills: usize,
        tenure_days: i64,
        active: bool,
    },

    // ── Scorer ─────────────────────────────────────
    ScorerTrained {
        scorer: String,
        samples: usize,
        feature_width: usize,
    },

    // ── Selection ──────────────────────────────────
    TaskSkipped {
        task_id: TaskId,
        task_key: String,
        reason: String,
    },
    CandidateAccepted {
        task_id: TaskId,
        employee_id: EmployeeId,
        month_key: MonthKey,
        rank: usize,
        score: f64,
        estimated_hours: f64,
    },
    CandidateRejected {
        task_id: TaskId,
        employee_id: EmployeeId,
        rank: usize,
        score: f64,
        reason: String,
    },
    TaskAssigned {
        task_id: TaskId,
        task_key: String,
        month_key: MonthKey,
        accepted: usize,
        assignee_in_candidates: bool,
    },
}

impl MatchEvent {
    /// Pipeline stage that emitted the event.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::RunInitialized { .. } | Self::RunCompleted { .. } => "engine",
            Self::RecordIssue { .. } => "ingest",
            Self::SkillLevelsRecomputed { .. } => "skill_aggregator",
            Self::ScorerTrained { .. } => "scorer",
            Self::TaskSkipped { .. }
            | Self::CandidateAccepted { .. }
            | Self::CandidateRejected { .. }
            | Self::TaskAssigned { .. } => "selector",
        }
    }
}

pub fn event_type_name(event: &MatchEvent) -> &'static str {
    match event {
        MatchEvent::RunInitialized { .. } => "run_initialized",
        MatchEvent::RunCompleted { .. } => "run_completed",
        MatchEvent::RecordIssue { .. } => "record_issue",
        MatchEvent::SkillLevelsRecomputed { .. } => "skill_levels_recomputed",
        MatchEvent::ScorerTrained { .. } => "scorer_trained",
        MatchEvent::TaskSkipped { .. } => "task_skipped",
        MatchEvent::CandidateAccepted { .. } => "candidate_accepted",
        MatchEvent::CandidateRejected { .. } => "candidate_rejected",
        MatchEvent::TaskAssigned { .. } => "task_assigned",
    }
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: Option<i64>,
    pub run_id: RunId,
    pub seq: u64,
    pub stage: String,
    pub event_type: String,
    pub payload: String, // JSON-serialized MatchEvent
}

impl EventLogEntry {
    pub fn from_event(run_id: &str, seq: u64, event: &MatchEvent) -> serde_json::Result<Self> {
        Ok(Self {
            id: None,
            run_id: run_id.to_string(),
            seq,
            stage: event.stage().to_string(),
            event_type: event_type_name(event).to_string(),
            payload: serde_json::to_string(event)?,
        })
    }
}
