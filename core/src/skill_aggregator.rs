//! Skill aggregator: historical experience → 1–10 proficiency levels.
//!
//! RULES:
//!   - experience is min-max normalized across the employee's OWN skills;
//!     when every value is equal (one skill included) the norm is 0.5.
//!   - tenure is normalized against the fleet-wide maximum so levels stay
//!     comparable between employees.
//!   - zero-experience skills are absent, never emitted at the floor.
//!   - levels are recomputed wholesale every run.

use crate::{
    config::ProficiencyConfig,
    model::{SkillRecord, Task},
    tenure::TenureTracker,
    types::EmployeeId,
};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Total experience units per employee per skill.
pub type ExperienceTotals = BTreeMap<EmployeeId, BTreeMap<String, f64>>;

/// Credit each assignee with the task's logged hours on every skill the task
/// required. Tasks without an assignee or without logged hours credit nothing.
pub fn experience_totals(tasks: &[Task]) -> ExperienceTotals {
    let mut totals = ExperienceTotals::new();
    for task in tasks {
        let (Some(assignee), Some(hours)) = (&task.assignee, task.actual_hours) else {
            continue;
        };
        let per_skill = totals.entry(assignee.clone()).or_default();
        for req in &task.requirements {
            *per_skill.entry(req.name.clone()).or_insert(0.0) += hours;
        }
    }
    totals
}

/// Min-max position of `value` in `[min, max]`; 0.5 on a degenerate range.
pub fn experience_norm(value: f64, min: f64, max: f64) -> f64 {
    if max == min {
        0.5
    } else {
        ((value - min) / (max - min)).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone)]
pub struct SkillAggregator {
    experience_weight: f64,
    tenure_weight: f64,
    min_level: f64,
    max_level: f64,
}

impl SkillAggregator {
    pub fn new(config: &ProficiencyConfig) -> Self {
        Self {
            experience_weight: config.experience_weight,
            tenure_weight: config.tenure_weight,
            min_level: config.min_level,
            max_level: config.max_level,
        }
    }

    pub fn level(&self, experience_norm: f64, tenure_norm: f64) -> f64 {
        let blend = self.experience_weight * experience_norm + self.tenure_weight * tenure_norm;
        (self.min_level + (self.max_level - self.min_level) * blend)
            .clamp(self.min_level, self.max_level)
    }

    /// Levels for one employee's skills, in skill-name order.
    pub fn employee_levels(
        &self,
        experience: &BTreeMap<String, f64>,
        tenure_norm: f64,
        today: NaiveDate,
    ) -> Vec<SkillRecord> {
        let positive: Vec<(&String, f64)> = experience
            .iter()
            .filter(|(_, v)| v.is_finite() && **v > 0.0)
            .map(|(k, v)| (k, *v))
            .collect();
        if positive.is_empty() {
            return Vec::new();
        }

        let min = positive.iter().map(|(_, v)| *v).fold(f64::INFINITY, f64::min);
        let max = positive.iter().map(|(_, v)| *v).fold(f64::NEG_INFINITY, f64::max);

        positive
            .into_iter()
            .map(|(name, value)| SkillRecord {
                name: name.clone(),
                level: self.level(experience_norm(value, min, max), tenure_norm),
                updated_at: Some(today),
            })
            .collect()
    }

    /// Replacement skill sets for every employee with recorded experience.
    pub fn aggregate(
        &self,
        totals: &ExperienceTotals,
        tenure: &TenureTracker,
    ) -> BTreeMap<EmployeeId, Vec<SkillRecord>> {
        totals
            .iter()
            .map(|(employee_id, experience)| {
                let levels = self.employee_levels(
                    experience,
                    tenure.tenure_norm(employee_id),
                    tenure.today(),
                );
                log::debug!(
                    "skill levels for {employee_id}: {} skills, tenure_norm={:.3}",
                    levels.len(),
                    tenure.tenure_norm(employee_id)
                );
                (employee_id.clone(), levels)
            })
            .collect()
    }
}
