//! The match engine: one complete, stateless assignment run.
//!
//! EXECUTION ORDER (fixed, never reordered):
//!   1. Fetch employees and tasks from the sources (any failure aborts)
//!   2. Normalize raw records at the ingestion boundary
//!   3. Tenure tracker over the task history
//!   4. Skill aggregator: replacement levels, derived activity
//!   5. Time estimation
//!   6. Text encoder fit, training set, scorer training
//!   7. Assignment selector: chronological fold with the monthly ledger
//!
//! RULES:
//!   - All randomness flows through the RngBank.
//!   - Nothing is written anywhere until `persist` is called with the
//!     finished output. An aborted run leaves no trace.

use crate::{
    capacity::LedgerEntry,
    config::MatchConfig,
    error::{MatchError, MatchResult},
    estimation::{apply_estimates, estimate_hours, TaskEstimate},
    event::MatchEvent,
    features::FeatureBuilder,
    ingest::{normalize_employee, normalize_task},
    model::{Employee, EmployeeSkillUpdate, Task, TaskAssignment},
    rng::{RngBank, StreamSlot},
    scorer::{completion_label, Scorer, TrainingSample},
    selector::{AssignmentSelector, SelectionPolicy},
    skill_aggregator::{experience_totals, SkillAggregator},
    source::{AssignmentSink, EmployeeSource, TaskSource},
    tenure::TenureTracker,
    text_encoder::TfidfProjector,
    types::RunId,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Everything a run produces, handed to the sink as one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutput {
    pub run_id: RunId,
    pub seed: u64,
    pub today: NaiveDate,
    pub skill_updates: Vec<EmployeeSkillUpdate>,
    pub assignments: Vec<TaskAssignment>,
    pub estimates: Vec<TaskEstimate>,
    /// Final ledger state. Informational only; the next run starts from zero.
    pub ledger: Vec<LedgerEntry>,
    pub events: Vec<MatchEvent>,
}

impl RunOutput {
    pub fn accepted_candidates(&self) -> usize {
        self.assignments.iter().map(|a| a.candidates.len()).sum()
    }

    pub fn skill_update(&self, employee_id: &str) -> Option<&EmployeeSkillUpdate> {
        self.skill_updates.iter().find(|u| u.employee_id == employee_id)
    }

    pub fn assignment(&self, task_key: &str) -> Option<&TaskAssignment> {
        self.assignments.iter().find(|a| a.task_key == task_key)
    }
}

pub struct MatchEngine {
    pub run_id: RunId,
    pub rng_bank: RngBank,
    config: MatchConfig,
}

impl MatchEngine {
    pub fn new(run_id: RunId, seed: u64, config: MatchConfig) -> MatchResult<Self> {
        config.validate()?;
        Ok(Self {
            run_id,
            rng_bank: RngBank::new(seed),
            config,
        })
    }

    pub fn seed(&self) -> u64 {
        self.rng_bank.master_seed()
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn run(
        &self,
        tasks: &dyn TaskSource,
        employees: &dyn EmployeeSource,
        scorer: &dyn Scorer,
        today: NaiveDate,
    ) -> MatchResult<RunOutput> {
        let mut events = vec![MatchEvent::RunInitialized {
            run_id: self.run_id.clone(),
            seed: self.seed(),
            today: today.to_string(),
        }];

        // 1. Fetch. Either source failing aborts before anything is computed.
        let employee_records = employees
            .fetch_employees()
            .map_err(|e| upstream(employees.source_name(), e))?;
        let task_records = tasks
            .fetch_tasks()
            .map_err(|e| upstream(tasks.source_name(), e))?;
        log::info!(
            "run {}: {} employees, {} tasks",
            self.run_id,
            employee_records.len(),
            task_records.len()
        );

        // 2. Normalize.
        let mut issues = Vec::new();
        let mut roster: Vec<Employee> = employee_records
            .iter()
            .map(|r| {
                let (employee, found) = normalize_employee(r);
                issues.extend(found);
                employee
            })
            .collect();
        let mut history: Vec<Task> = task_records
            .iter()
            .map(|r| {
                let (task, found) = normalize_task(r);
                issues.extend(found);
                task
            })
            .collect();
        for issue in &issues {
            log::warn!("{issue}");
            events.push(record_issue(issue));
        }

        // 3–4. Tenure and proficiency.
        let tenure = TenureTracker::from_history(&history, today);
        let aggregator = SkillAggregator::new(&self.config.proficiency);
        let levels = aggregator.aggregate(&experience_totals(&history), &tenure);
        let window = self.config.proficiency.active_window_days;

        let mut skill_updates = Vec::with_capacity(roster.len());
        for employee in &mut roster {
            match (tenure.tenure_days(&employee.id), levels.get(&employee.id)) {
                (Some(days), recomputed) => {
                    employee.skills = recomputed.cloned().unwrap_or_default();
                    employee.tenure_days = days;
                    employee.active = tenure
                        .recently_active(&employee.id, window)
                        .unwrap_or(employee.active);
                }
                // Experience logged only on undated tasks: levels are still
                // replaced, tenure contributes nothing.
                (None, Some(recomputed)) => {
                    employee.skills = recomputed.clone();
                    let gap = MatchError::DataGap {
                        entity: "employee",
                        id: employee.id.clone(),
                        detail: "experience without dated tasks, tenure_norm taken as 0".into(),
                    };
                    log::warn!("{gap}");
                    events.push(record_issue(&gap));
                }
                (None, None) => {}
            }
            events.push(MatchEvent::SkillLevelsRecomputed {
                employee_id: employee.id.clone(),
                skills: employee.skills.len(),
                tenure_days: employee.tenure_days,
                active: employee.active,
            });
            skill_updates.push(EmployeeSkillUpdate {
                employee_id: employee.id.clone(),
                skills: employee.skills.clone(),
                tenure_days: employee.tenure_days,
                active: employee.active,
            });
        }

        // 5. Estimates.
        let estimates = estimate_hours(&history, self.config.estimation.tolerance);
        apply_estimates(&mut history, &estimates);

        // 6. Scorer.
        let corpus: Vec<&str> = history.iter().map(|t| t.text.as_str()).collect();
        let encoder = TfidfProjector::fit(
            &corpus,
            self.config.text.max_vocabulary,
            self.config.text.dimensions,
            &mut self.rng_bank.for_stream(StreamSlot::TextEncoder),
        );
        let builder = FeatureBuilder::new(&encoder, &tenure);
        let max_observed_hours = history
            .iter()
            .filter_map(|t| t.actual_hours)
            .fold(0.0, f64::max);

        let samples = training_samples(&history, &roster, &builder, max_observed_hours);
        let model = scorer.train(&samples, &mut self.rng_bank.for_stream(StreamSlot::Scorer))?;
        events.push(MatchEvent::ScorerTrained {
            scorer: scorer.name().to_string(),
            samples: samples.len(),
            feature_width: builder.dimensions(),
        });

        // 7. Selection.
        let selector = AssignmentSelector::new(
            builder,
            model.as_ref(),
            SelectionPolicy::from(&self.config.selection),
            max_observed_hours,
        );
        let selection = selector.run(&history, &roster, self.config.selection.monthly_quota_hours);
        let tasks_skipped = selection.skipped();
        events.extend(selection.events);

        let tasks_assigned = selection.assignments.len();
        let candidates_accepted: usize =
            selection.assignments.iter().map(|a| a.candidates.len()).sum();
        events.push(MatchEvent::RunCompleted {
            run_id: self.run_id.clone(),
            tasks_assigned,
            tasks_skipped,
            candidates_accepted,
        });
        log::info!(
            "run {} complete: {tasks_assigned} tasks processed, {tasks_skipped} skipped, \
             {candidates_accepted} candidates accepted",
            self.run_id
        );

        Ok(RunOutput {
            run_id: self.run_id.clone(),
            seed: self.seed(),
            today,
            skill_updates,
            assignments: selection.assignments,
            estimates,
            ledger: selection.ledger.entries(),
            events,
        })
    }

    /// Hand a finished run to the sink.
    pub fn persist(&self, output: &RunOutput, sink: &dyn AssignmentSink) -> MatchResult<()> {
        sink.persist(output)?;
        log::info!("run {} persisted", output.run_id);
        Ok(())
    }
}

/// Historical tasks with a known assignee on the roster, logged hours,
/// declared requirements and a non-empty assignee skill set.
fn training_samples(
    history: &[Task],
    roster: &[Employee],
    builder: &FeatureBuilder<'_>,
    max_observed_hours: f64,
) -> Vec<TrainingSample> {
    history
        .iter()
        .filter(|t| !t.requirements.is_empty())
        .filter_map(|task| {
            let actual = task.actual_hours?;
            let assignee = task.assignee.as_ref()?;
            let employee = roster.iter().find(|e| &e.id == assignee)?;
            if employee.skills.is_empty() {
                return None;
            }
            Some(TrainingSample {
                features: builder.build(task, employee),
                label: completion_label(max_observed_hours, actual),
            })
        })
        .collect()
}

fn upstream(source_name: &str, err: MatchError) -> MatchError {
    match err {
        e @ MatchError::UpstreamSource { .. } => e,
        other => MatchError::UpstreamSource {
            source_name: source_name.to_string(),
            reason: other.to_string(),
        },
    }
}

fn record_issue(issue: &MatchError) -> MatchEvent {
    let (owner, kind) = match issue {
        MatchError::DataGap { entity, id, .. } => (format!("{entity} {id}"), "data_gap"),
        MatchError::MalformedRecord { owner, .. } => (owner.clone(), "malformed_record"),
        _ => (String::new(), "other"),
    };
    MatchEvent::RecordIssue {
        owner,
        kind: kind.to_string(),
        detail: issue.to_string(),
    }
}
