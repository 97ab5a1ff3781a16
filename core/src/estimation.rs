//! Per-project time estimation.
//!
//! "To Do" tasks count as zero logged hours and receive no estimate. Every
//! other task in a project is estimated as the mean logged hours of its
//! assignee within that project, or the project mean when unassigned.

use crate::{
    model::Task,
    types::{EmployeeId, TaskId},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEstimate {
    pub task_id: TaskId,
    pub task_key: String,
    pub estimated_hours: Option<f64>,
    pub actual_hours: f64,
    pub well_estimated: Option<bool>,
}

#[derive(Debug, Default)]
struct Mean {
    sum: f64,
    n: usize,
}

impl Mean {
    fn add(&mut self, v: f64) {
        self.sum += v;
        self.n += 1;
    }

    fn value(&self) -> Option<f64> {
        (self.n > 0).then(|| self.sum / self.n as f64)
    }
}

fn logged_hours(task: &Task) -> Option<f64> {
    if task.is_todo() {
        Some(0.0)
    } else {
        task.actual_hours
    }
}

/// Within `tolerance × estimate` of the estimate.
pub fn is_well_estimated(actual: f64, estimate: f64, tolerance: f64) -> bool {
    (actual - estimate).abs() <= tolerance * estimate
}

/// Estimate every task. Output keeps input order. Tasks without a project
/// get no estimate.
pub fn estimate_hours(tasks: &[Task], tolerance: f64) -> Vec<TaskEstimate> {
    let mut by_project: BTreeMap<&str, Mean> = BTreeMap::new();
    let mut by_assignee: BTreeMap<(&str, &EmployeeId), Mean> = BTreeMap::new();

    for task in tasks {
        let (Some(project), Some(hours)) = (task.project.as_deref(), logged_hours(task)) else {
            continue;
        };
        by_project.entry(project).or_default().add(hours);
        if let Some(assignee) = &task.assignee {
            by_assignee.entry((project, assignee)).or_default().add(hours);
        }
    }

    tasks
        .iter()
        .map(|task| {
            let actual = logged_hours(task).unwrap_or(0.0);
            let estimate = match (task.project.as_deref(), task.is_todo()) {
                (Some(project), false) => {
                    let project_mean = by_project.get(project).and_then(Mean::value);
                    match &task.assignee {
                        Some(a) => by_assignee
                            .get(&(project, a))
                            .and_then(Mean::value)
                            .or(project_mean),
                        None => project_mean,
                    }
                }
                _ => None,
            };
            TaskEstimate {
                task_id: task.id,
                task_key: task.key.clone(),
                estimated_hours: estimate,
                actual_hours: actual,
                well_estimated: estimate.map(|e| is_well_estimated(actual, e, tolerance)),
            }
        })
        .collect()
}

/// Fill `estimated_hours` on tasks that carry none.
pub fn apply_estimates(tasks: &mut [Task], estimates: &[TaskEstimate]) {
    let by_id: BTreeMap<TaskId, f64> = estimates
        .iter()
        .filter_map(|e| e.estimated_hours.map(|h| (e.task_id, h)))
        .collect();
    for task in tasks.iter_mut().filter(|t| t.estimated_hours.is_none()) {
        task.estimated_hours = by_id.get(&task.id).copied();
    }
}
