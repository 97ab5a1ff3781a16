//! Tenure tracker: days since each employee's first task, and the fleet max.
//!
//! Pure function of the task history and `today`. Rebuilt every run.

use crate::{model::Task, types::EmployeeId};
use chrono::NaiveDate;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct TenureTracker {
    today: NaiveDate,
    first_task: BTreeMap<EmployeeId, NaiveDate>,
    last_task: BTreeMap<EmployeeId, NaiveDate>,
    fleet_max_days: i64,
}

impl TenureTracker {
    /// Build from every dated task that has an assignee.
    pub fn from_history(tasks: &[Task], today: NaiveDate) -> Self {
        let mut first_task: BTreeMap<EmployeeId, NaiveDate> = BTreeMap::new();
        let mut last_task: BTreeMap<EmployeeId, NaiveDate> = BTreeMap::new();

        for task in tasks {
            let (Some(assignee), Some(date)) = (&task.assignee, task.date) else {
                continue;
            };
            let day = date.date();
            first_task
                .entry(assignee.clone())
                .and_modify(|d| *d = (*d).min(day))
                .or_insert(day);
            last_task
                .entry(assignee.clone())
                .and_modify(|d| *d = (*d).max(day))
                .or_insert(day);
        }

        let fleet_max_days = first_task
            .values()
            .map(|first| days_between(*first, today))
            .max()
            .unwrap_or(0);

        Self {
            today,
            first_task,
            last_task,
            fleet_max_days,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn fleet_max_days(&self) -> i64 {
        self.fleet_max_days
    }

    /// Days since the employee's first task. `None` without history.
    pub fn tenure_days(&self, employee_id: &str) -> Option<i64> {
        self.first_task
            .get(employee_id)
            .map(|first| days_between(*first, self.today))
    }

    /// `min(days / fleet_max, 1.0)`; 0.0 without history or when the fleet max is 0.
    pub fn tenure_norm(&self, employee_id: &str) -> f64 {
        match self.tenure_days(employee_id) {
            Some(days) => normalize_tenure(days, self.fleet_max_days),
            None => 0.0,
        }
    }

    pub fn last_task_date(&self, employee_id: &str) -> Option<NaiveDate> {
        self.last_task.get(employee_id).copied()
    }

    /// Whether the employee worked a task within the last `window_days`.
    /// `None` when the employee has no history at all.
    pub fn recently_active(&self, employee_id: &str, window_days: i64) -> Option<bool> {
        self.last_task_date(employee_id)
            .map(|last| days_between(last, self.today) < window_days)
    }
}

/// Shared denominator normalization, clamped to [0, 1].
pub fn normalize_tenure(days: i64, fleet_max_days: i64) -> f64 {
    if fleet_max_days <= 0 {
        return 0.0;
    }
    (days.max(0) as f64 / fleet_max_days as f64).min(1.0)
}

fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days().max(0)
}
