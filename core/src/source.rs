//! Collaborator seams: where records come from and where results go.
//!
//! Sources hand over raw records; normalization happens in `ingest`, once.
//! Any error a source returns aborts the run.

use crate::{
    engine::RunOutput,
    error::{MatchError, MatchResult},
    ingest::{EmployeeRecord, TaskRecord},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub trait TaskSource {
    fn source_name(&self) -> &str;
    fn fetch_tasks(&self) -> MatchResult<Vec<TaskRecord>>;
}

pub trait EmployeeSource {
    fn source_name(&self) -> &str;
    fn fetch_employees(&self) -> MatchResult<Vec<EmployeeRecord>>;
}

/// Receives the complete output of a run. Implementations must write all of
/// it or none of it.
pub trait AssignmentSink {
    fn persist(&self, output: &RunOutput) -> MatchResult<()>;
}

/// Task and employee records bundled in one JSON document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonDataset {
    #[serde(default)]
    pub employees: Vec<EmployeeRecord>,
    #[serde(default)]
    pub tasks: Vec<TaskRecord>,
}

impl JsonDataset {
    pub fn load(path: impl AsRef<Path>) -> MatchResult<Self> {
        let path = path.as_ref();
        let upstream = |reason: String| MatchError::UpstreamSource {
            source_name: path.display().to_string(),
            reason,
        };
        let raw = std::fs::read_to_string(path).map_err(|e| upstream(e.to_string()))?;
        serde_json::from_str(&raw).map_err(|e| upstream(e.to_string()))
    }

    pub fn from_json(raw: &str) -> MatchResult<Self> {
        serde_json::from_str(raw).map_err(|e| MatchError::UpstreamSource {
            source_name: "json".into(),
            reason: e.to_string(),
        })
    }
}

impl TaskSource for JsonDataset {
    fn source_name(&self) -> &str {
        "json_dataset"
    }

    fn fetch_tasks(&self) -> MatchResult<Vec<TaskRecord>> {
        Ok(self.tasks.clone())
    }
}

impl EmployeeSource for JsonDataset {
    fn source_name(&self) -> &str {
        "json_dataset"
    }

    fn fetch_employees(&self) -> MatchResult<Vec<EmployeeRecord>> {
        Ok(self.employees.clone())
    }
}
