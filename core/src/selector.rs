//! Assignment selector.
//!
//! RULES:
//!   - Tasks are visited in ascending date order. Ties keep input order.
//!   - Undated tasks are skipped outright. They never touch the ledger.
//!   - Only the top `candidate_pool_size` by raw score are considered,
//!     unless `extend_pool_on_shortfall` is set.
//!   - The ledger is the only state carried from one task to the next.

use crate::{
    capacity::{estimated_hours, MonthlyLedger},
    config::SelectionConfig,
    eligibility,
    event::MatchEvent,
    features::FeatureBuilder,
    model::{CandidateResult, Employee, Task, TaskAssignment},
    scorer::FitModel,
    types::MonthKey,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionPolicy {
    pub pool_size: usize,
    pub max_accepted: usize,
    pub extend_pool_on_shortfall: bool,
}

impl From<&SelectionConfig> for SelectionPolicy {
    fn from(c: &SelectionConfig) -> Self {
        Self {
            pool_size: c.candidate_pool_size,
            max_accepted: c.max_accepted,
            extend_pool_on_shortfall: c.extend_pool_on_shortfall,
        }
    }
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            pool_size: 3,
            max_accepted: 3,
            extend_pool_on_shortfall: false,
        }
    }
}

/// Sort by score descending. Stable, so equal scores keep input order.
/// NaN scores rank last.
pub fn rank_by_score<'e>(mut scored: Vec<(&'e Employee, f64)>) -> Vec<(&'e Employee, f64)> {
    let key = |s: f64| if s.is_nan() { f64::NEG_INFINITY } else { s };
    scored.sort_by(|a, b| key(b.1).total_cmp(&key(a.1)));
    scored
}

/// Walk a ranked candidate list for one task, gating on eligibility and
/// then on capacity. Mutates `ledger` only for accepted candidates.
pub fn select_candidates(
    task: &Task,
    month: &MonthKey,
    ranked: &[(&Employee, f64)],
    policy: &SelectionPolicy,
    max_observed_hours: f64,
    ledger: &mut MonthlyLedger,
    events: &mut Vec<MatchEvent>,
) -> Vec<CandidateResult> {
    let reach = if policy.extend_pool_on_shortfall {
        ranked.len()
    } else {
        policy.pool_size.min(ranked.len())
    };

    let mut accepted = Vec::new();
    for (position, (employee, score)) in ranked.iter().take(reach).enumerate() {
        if accepted.len() >= policy.max_accepted {
            break;
        }
        let rank = position + 1;
        let reject = |reason: String| MatchEvent::CandidateRejected {
            task_id: task.id,
            employee_id: employee.id.clone(),
            rank,
            score: *score,
            reason,
        };

        if !score.is_finite() {
            events.push(reject(format!("non-finite score {score}")));
            continue;
        }

        let outcome = eligibility::check(task, employee);
        if !outcome.is_eligible() {
            events.push(reject(outcome.reason()));
            continue;
        }

        let hours = estimated_hours(max_observed_hours, *score);
        if !ledger.try_accept(&employee.id, month, hours) {
            let held = ledger.hours(&employee.id, month);
            events.push(reject(format!(
                "monthly quota: {held:.2}h held + {hours:.2}h estimate > {:.0}h",
                ledger.quota()
            )));
            continue;
        }

        events.push(MatchEvent::CandidateAccepted {
            task_id: task.id,
            employee_id: employee.id.clone(),
            month_key: month.clone(),
            rank,
            score: *score,
            estimated_hours: hours,
        });
        accepted.push(CandidateResult {
            employee_id: employee.id.clone(),
            score: *score,
            rank,
            accepted: true,
        });
    }
    accepted
}

/// Result of one full selection pass.
#[derive(Debug, Clone)]
pub struct SelectionRun {
    pub assignments: Vec<TaskAssignment>,
    pub ledger: MonthlyLedger,
    pub events: Vec<MatchEvent>,
}

impl SelectionRun {
    pub fn skipped(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, MatchEvent::TaskSkipped { .. }))
            .count()
    }
}

pub struct AssignmentSelector<'a> {
    builder: FeatureBuilder<'a>,
    model: &'a dyn FitModel,
    policy: SelectionPolicy,
    max_observed_hours: f64,
}

impl<'a> AssignmentSelector<'a> {
    pub fn new(
        builder: FeatureBuilder<'a>,
        model: &'a dyn FitModel,
        policy: SelectionPolicy,
        max_observed_hours: f64,
    ) -> Self {
        Self {
            builder,
            model,
            policy,
            max_observed_hours,
        }
    }

    /// Score every active employee against `task`, best first.
    pub fn rank<'e>(&self, task: &Task, employees: &'e [Employee]) -> Vec<(&'e Employee, f64)> {
        let prepared = self.builder.prepare(task);
        let scored = employees
            .iter()
            .filter(|e| e.active)
            .map(|e| (e, self.model.predict(&self.builder.combine(&prepared, e))))
            .collect();
        rank_by_score(scored)
    }

    /// Process one task against the running ledger. `None` when skipped.
    pub fn assign(
        &self,
        task: &Task,
        employees: &[Employee],
        ledger: &mut MonthlyLedger,
        events: &mut Vec<MatchEvent>,
    ) -> Option<TaskAssignment> {
        let Some(month) = task.month_key() else {
            log::debug!("task {} has no date; skipped", task.key);
            events.push(MatchEvent::TaskSkipped {
                task_id: task.id,
                task_key: task.key.clone(),
                reason: "no date".into(),
            });
            return None;
        };

        let ranked = self.rank(task, employees);
        let candidates = select_candidates(
            task,
            &month,
            &ranked,
            &self.policy,
            self.max_observed_hours,
            ledger,
            events,
        );
        let assignee_in_candidates = task
            .assignee
            .as_ref()
            .is_some_and(|a| candidates.iter().any(|c| &c.employee_id == a));

        events.push(MatchEvent::TaskAssigned {
            task_id: task.id,
            task_key: task.key.clone(),
            month_key: month.clone(),
            accepted: candidates.len(),
            assignee_in_candidates,
        });
        Some(TaskAssignment {
            task_id: task.id,
            task_key: task.key.clone(),
            month_key: month,
            candidates,
            assignee_in_candidates,
        })
    }

    /// The full pass: a fold over date-sorted tasks with the ledger as
    /// accumulator.
    pub fn run(&self, tasks: &[Task], employees: &[Employee], quota: f64) -> SelectionRun {
        let mut ordered: Vec<&Task> = tasks.iter().collect();
        ordered.sort_by_key(|t| t.date);

        let initial = SelectionRun {
            assignments: Vec::new(),
            ledger: MonthlyLedger::new(quota),
            events: Vec::new(),
        };
        ordered.into_iter().fold(initial, |mut acc, task| {
            if let Some(a) = self.assign(task, employees, &mut acc.ledger, &mut acc.events) {
                acc.assignments.push(a);
            }
            acc
        })
    }
}
