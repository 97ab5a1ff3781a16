//! Feature builder: one fixed-layout numeric vector per (task, employee).
//!
//! INVARIANT: training and inference build vectors through the very same
//! `combine` path. Never add a feature to one side only.
//!
//! Layout:
//!   0  skill match ratio
//!   1  required skill count
//!   2  employee skill count
//!   3  tenure norm
//!   4  status == Resolved
//!   5  status == Closed
//!   6  issue type == Sub-task
//!   7.. text components (encoder dims)

use crate::{
    model::{
        Employee, SkillRecord, SkillRequirement, Task, ISSUE_TYPE_SUBTASK, STATUS_CLOSED,
        STATUS_RESOLVED,
    },
    tenure::TenureTracker,
    text_encoder::TextEncoder,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const BASE_FEATURES: usize = 7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// `|required ∩ skills| / |required|`, and 0.0 when nothing is required.
pub fn skill_match_ratio(required: &[SkillRequirement], skills: &[SkillRecord]) -> f64 {
    let wanted: BTreeSet<&str> = required.iter().map(|r| r.name.as_str()).collect();
    if wanted.is_empty() {
        return 0.0;
    }
    let held: BTreeSet<&str> = skills.iter().map(|s| s.name.as_str()).collect();
    wanted.intersection(&held).count() as f64 / wanted.len() as f64
}

/// Task-side features, computed once per task and reused for every employee.
#[derive(Debug, Clone)]
pub struct TaskFeatures<'t> {
    task: &'t Task,
    text: Vec<f64>,
}

pub struct FeatureBuilder<'a> {
    encoder: &'a dyn TextEncoder,
    tenure: &'a TenureTracker,
}

impl<'a> FeatureBuilder<'a> {
    pub fn new(encoder: &'a dyn TextEncoder, tenure: &'a TenureTracker) -> Self {
        Self { encoder, tenure }
    }

    pub fn dimensions(&self) -> usize {
        BASE_FEATURES + self.encoder.dims()
    }

    pub fn prepare<'t>(&self, task: &'t Task) -> TaskFeatures<'t> {
        TaskFeatures {
            task,
            text: self.encoder.encode(&task.text),
        }
    }

    pub fn combine(&self, prepared: &TaskFeatures<'_>, employee: &Employee) -> FeatureVector {
        let task = prepared.task;
        let mut values = Vec::with_capacity(self.dimensions());
        values.push(skill_match_ratio(&task.requirements, &employee.skills));
        values.push(task.requirements.len() as f64);
        values.push(employee.skills.len() as f64);
        values.push(self.tenure.tenure_norm(&employee.id));
        values.push(flag(task.status == STATUS_RESOLVED));
        values.push(flag(task.status == STATUS_CLOSED));
        values.push(flag(task.issue_type == ISSUE_TYPE_SUBTASK));
        values.extend_from_slice(&prepared.text);
        FeatureVector(values)
    }

    pub fn build(&self, task: &Task, employee: &Employee) -> FeatureVector {
        self.combine(&self.prepare(task), employee)
    }
}

fn flag(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}
