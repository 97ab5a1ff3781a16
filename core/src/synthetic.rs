//! Deterministic synthetic workforce: employees plus task history.
//!
//! Used by the runner's demo mode and by the large property tests.
//! Same seed, same dataset. Skill entries deliberately rotate through every
//! raw encoding the ingestion boundary accepts.

use crate::{
    ingest::{EmployeeRecord, KeyedSkill, RawSkillEntry, TaskRecord},
    model::{ISSUE_TYPE_SUBTASK, STATUS_CLOSED, STATUS_RESOLVED, STATUS_TODO},
    rng::StreamRng,
    source::JsonDataset,
};
use chrono::{Duration, NaiveDate};
use serde_json::{json, Value};

const SKILLS: &[&str] = &[
    "API", "SQL", "Frontend", "DevOps", "Testing", "Security", "Data", "Mobile",
];
const PROJECTS: &[&str] = &["OPS", "WEB", "DATA"];
const STATUSES: &[&str] = &[STATUS_TODO, "In Progress", STATUS_RESOLVED, STATUS_CLOSED];
const ISSUE_TYPES: &[&str] = &["Task", "Bug", "Story", ISSUE_TYPE_SUBTASK];
const VERBS: &[&str] = &["fix", "add", "refactor", "migrate", "document", "review", "deploy"];
const NOUNS: &[&str] = &[
    "login", "endpoint", "schema", "pipeline", "dashboard", "cache", "report", "queue",
];

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticShape {
    pub employees: usize,
    pub tasks: usize,
    pub start: NaiveDate,
    pub span_days: i64,
    /// Share of tasks delivered without a date.
    pub undated_share: f64,
}

impl SyntheticShape {
    pub fn new(employees: usize, tasks: usize, start: NaiveDate) -> Self {
        Self {
            employees,
            tasks,
            start,
            span_days: 180,
            undated_share: 0.05,
        }
    }
}

pub fn generate(shape: &SyntheticShape, rng: &mut StreamRng) -> JsonDataset {
    let employees: Vec<EmployeeRecord> = (0..shape.employees)
        .map(|i| synth_employee(i, rng))
        .collect();

    let tasks = (0..shape.tasks)
        .map(|i| {
            let assignee = if !employees.is_empty() && rng.chance(0.85) {
                Some(rng.pick(&employees).id.clone())
            } else {
                None
            };
            synth_task(i, assignee, shape, rng)
        })
        .collect();

    log::debug!(
        "synthetic dataset: {} employees, {} tasks",
        shape.employees,
        shape.tasks
    );
    JsonDataset { employees, tasks }
}

fn synth_employee(i: usize, rng: &mut StreamRng) -> EmployeeRecord {
    let count = 2 + rng.next_u64_below(3) as usize;
    let skills = distinct_skills(count, rng)
        .into_iter()
        .enumerate()
        .map(|(n, name)| {
            let level = 1 + rng.next_u64_below(10);
            encode(n, name, json!(level))
        })
        .collect();
    EmployeeRecord {
        id: format!("emp-{:03}", i + 1),
        skills,
        active: rng.chance(0.9),
        tenure_days: None,
    }
}

fn synth_task(
    i: usize,
    assignee: Option<String>,
    shape: &SyntheticShape,
    rng: &mut StreamRng,
) -> TaskRecord {
    let project = *rng.pick(PROJECTS);
    let status = *rng.pick(STATUSES);
    let count = 1 + rng.next_u64_below(2) as usize;
    let skills = distinct_skills(count, rng)
        .into_iter()
        .enumerate()
        .map(|(n, name)| encode(n + i, name, json!(1 + rng.next_u64_below(5))))
        .collect();

    let date = if rng.chance(shape.undated_share) {
        None
    } else {
        let offset = rng.next_u64_below(shape.span_days.max(1) as u64) as i64;
        let day = shape.start + Duration::days(offset);
        Some(format!("{day} {:02}:00:00", 8 + rng.next_u64_below(10)))
    };
    let actual_hours = (status != STATUS_TODO)
        .then(|| (rng.pareto(2.0, 1.5).min(80.0) * 4.0).round() / 4.0);

    TaskRecord {
        id: i as i64 + 1,
        key: format!("{project}-{}", i + 1),
        project: Some(project.to_string()),
        skills,
        text: Some(format!("{} {} {}", rng.pick(VERBS), rng.pick(NOUNS), rng.pick(NOUNS))),
        status: Some(status.to_string()),
        issue_type: Some(rng.pick(ISSUE_TYPES).to_string()),
        date,
        estimated_hours: None,
        actual_hours,
        assignee,
    }
}

fn distinct_skills(count: usize, rng: &mut StreamRng) -> Vec<&'static str> {
    let mut picked: Vec<&'static str> = Vec::with_capacity(count);
    while picked.len() < count.min(SKILLS.len()) {
        let s = *rng.pick(SKILLS);
        if !picked.contains(&s) {
            picked.push(s);
        }
    }
    picked
}

/// Rotate through tuple, string-encoded and keyed shapes.
fn encode(n: usize, name: &str, value: Value) -> RawSkillEntry {
    match n % 3 {
        0 => RawSkillEntry::Tuple(vec![json!(name), value]),
        1 => RawSkillEntry::Encoded(format!("({name},{value})")),
        _ => RawSkillEntry::Keyed(KeyedSkill {
            name: Some(name.to_string()),
            value: Some(value),
            updated_at: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::parse_skill_entry;
    use crate::rng::{RngBank, StreamSlot};

    fn shape() -> SyntheticShape {
        SyntheticShape::new(12, 80, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
    }

    #[test]
    fn same_seed_same_dataset() {
        let a = generate(&shape(), &mut RngBank::new(9).for_stream(StreamSlot::Synthetic));
        let b = generate(&shape(), &mut RngBank::new(9).for_stream(StreamSlot::Synthetic));
        assert_eq!(a, b);
        assert_eq!(a.tasks.len(), 80);
    }

    #[test]
    fn every_generated_skill_entry_parses() {
        let ds = generate(&shape(), &mut RngBank::new(1).for_stream(StreamSlot::Synthetic));
        for e in &ds.employees {
            for s in &e.skills {
                assert!(parse_skill_entry(&e.id, s).is_ok(), "unparsable: {s:?}");
            }
        }
    }
}
