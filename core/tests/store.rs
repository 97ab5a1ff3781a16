//! Persistence tests: the store as source and sink, all-or-nothing writes,
//! and upstream failures that abort the run.

use chrono::NaiveDate;
use serde_json::json;
use skillmatch_core::{
    config::MatchConfig,
    engine::{MatchEngine, RunOutput},
    error::{MatchError, MatchResult},
    ingest::TaskRecord,
    scorer::BoostedTreesScorer,
    source::{AssignmentSink, JsonDataset, TaskSource},
    store::MatchStore,
};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()
}

fn dataset() -> JsonDataset {
    serde_json::from_value(json!({
        "employees": [
            {"id": "ana", "skills": [["API", 6]]},
            {"id": "bo",  "skills": ["(SQL,4.5,2024-05-01)"]},
            {"id": "cy",  "skills": [{"habilidad": "API", "nivel_actual": 8},
                                     {"habilidad": "SQL", "nivel_actual": 7}]},
            {"id": "dee", "skills": [["Frontend", 5]], "active": false}
        ],
        "tasks": [
            {"id": 1, "key": "OPS-1", "project": "OPS", "skills": [["API", 2]],
             "date": "2024-01-03 09:00:00", "assignee": "bo", "actual_hours": 10.0,
             "status": "Closed", "text": "fix login api timeout"},
            {"id": 2, "key": "OPS-2", "project": "OPS", "skills": [["API", 3], ["SQL", 2]],
             "date": "2024-05-01 14:00:00", "assignee": "ana", "actual_hours": 4.0,
             "status": "Resolved", "text": "add index to orders table"},
            {"id": 3, "key": "OPS-3", "project": "OPS", "skills": [["SQL", 1]],
             "date": "2024-06-10 11:00:00", "assignee": "bo", "actual_hours": 6.0,
             "status": "Resolved", "text": "migrate orders schema"},
            {"id": 4, "key": "OPS-4", "project": "OPS", "skills": [["API", 1]],
             "date": "2024-06-20 16:00:00", "status": "To Do", "text": "api rate limiting"},
            {"id": 5, "key": "OPS-5", "project": "OPS", "skills": [["API", 1], "garbled"],
             "status": "In Progress", "text": "document api"}
        ]
    }))
    .expect("fixture dataset")
}

fn seeded_store(run_id: &str) -> MatchStore {
    let store = MatchStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store.seed_dataset(&dataset()).expect("seed");
    store
        .insert_run(run_id, 7, "0.1.0-test", &today().to_string())
        .expect("insert run");
    store
}

fn run_on(store: &MatchStore, run_id: &str) -> MatchResult<RunOutput> {
    let config = MatchConfig::default_test();
    let scorer = BoostedTreesScorer::new(config.scorer.clone());
    let engine = MatchEngine::new(run_id.to_string(), 7, config)?;
    let output = engine.run(store, store, &scorer, today())?;
    engine.persist(&output, store)?;
    Ok(output)
}

#[test]
fn migrations_are_idempotent() {
    let store = MatchStore::in_memory().unwrap();
    store.migrate().expect("first");
    store.migrate().expect("second");
}

#[test]
fn store_reads_back_every_skill_encoding() {
    let store = seeded_store("read-back");
    let employees = store.employee_records().unwrap();
    assert_eq!(employees.len(), 4);
    assert_eq!(employees, dataset().employees);
    let tasks = store.task_records().unwrap();
    assert_eq!(tasks, dataset().tasks);
}

#[test]
fn records_inserted_one_at_a_time_read_back() {
    let store = MatchStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    let fixture = dataset();
    for e in &fixture.employees {
        store.insert_employee(e).expect("insert employee");
    }
    for t in &fixture.tasks {
        store.insert_task(t).expect("insert task");
    }

    assert_eq!(store.employee_records().unwrap(), fixture.employees);
    assert_eq!(store.task_records().unwrap(), fixture.tasks);
    assert!(
        store.insert_task(&fixture.tasks[0]).is_err(),
        "task ids are unique"
    );
}

#[test]
fn run_output_round_trips_through_the_store() {
    let store = seeded_store("round-trip");
    let output = run_on(&store, "round-trip").expect("run");

    for a in &output.assignments {
        let stored = store.candidates_for_task(a.task_id).unwrap();
        assert_eq!(stored, a.candidates, "candidates for {}", a.task_key);
        assert_eq!(
            store.assignee_in_candidates(a.task_id).unwrap(),
            Some(a.assignee_in_candidates)
        );
    }
    for u in &output.skill_updates {
        assert_eq!(store.employee_skills(&u.employee_id).unwrap(), {
            let mut sorted = u.skills.clone();
            sorted.sort_by(|x, y| x.name.cmp(&y.name));
            sorted
        });
        assert_eq!(store.employee_active(&u.employee_id).unwrap(), Some(u.active));
    }

    // OPS-5 has no date: skipped, never flagged.
    assert!(output.assignment("OPS-5").is_none());
    assert_eq!(store.assignee_in_candidates(5).unwrap(), None);

    // OPS-1 had no source estimate; the run filled it from bo's OPS mean.
    assert_eq!(store.estimated_hours(1).unwrap(), Some(8.0));

    assert_eq!(
        store.event_count("round-trip").unwrap() as usize,
        output.events.len()
    );
    assert!(store.run_finished("round-trip").unwrap());
}

#[test]
fn malformed_entry_is_reported_but_run_continues() {
    let store = seeded_store("malformed");
    let output = run_on(&store, "malformed").expect("run survives a garbled skill");
    let issues: Vec<String> = store
        .events_for_run("malformed")
        .unwrap()
        .into_iter()
        .filter(|e| e.event_type == "record_issue")
        .map(|e| e.payload)
        .collect();
    assert_eq!(issues.len(), 1, "exactly the garbled OPS-5 entry: {issues:?}");
    assert!(issues[0].contains("OPS-5"));
    assert!(!output.assignments.is_empty());
}

#[test]
fn rerun_from_scratch_reproduces_assignments() {
    let store = seeded_store("first");
    let first = run_on(&store, "first").expect("first run");
    store
        .insert_run("second", 7, "0.1.0-test", &today().to_string())
        .unwrap();
    let second = run_on(&store, "second").expect("second run");

    assert_eq!(first.assignments, second.assignments);
    assert_eq!(first.skill_updates, second.skill_updates);
    assert_eq!(first.estimates, second.estimates);
}

struct BrokenTracker;

impl TaskSource for BrokenTracker {
    fn source_name(&self) -> &str {
        "tracker"
    }

    fn fetch_tasks(&self) -> MatchResult<Vec<TaskRecord>> {
        Err(MatchError::UpstreamSource {
            source_name: "tracker".into(),
            reason: "connection refused".into(),
        })
    }
}

#[test]
fn upstream_failure_aborts_with_nothing_persisted() {
    let store = seeded_store("aborted");
    let config = MatchConfig::default_test();
    let scorer = BoostedTreesScorer::new(config.scorer.clone());
    let engine = MatchEngine::new("aborted".into(), 7, config).unwrap();

    let err = engine
        .run(&BrokenTracker, &store, &scorer, today())
        .expect_err("a failing source must abort");
    assert!(
        matches!(err, MatchError::UpstreamSource { ref source_name, .. } if source_name == "tracker"),
        "unexpected error: {err}"
    );

    assert_eq!(store.candidate_count().unwrap(), 0);
    assert_eq!(store.event_count("aborted").unwrap(), 0);
    assert!(!store.run_finished("aborted").unwrap());
    assert!(store.employee_skills("ana").unwrap().is_empty());
}

#[test]
fn persist_requires_a_registered_run() {
    let store = seeded_store("registered");
    let config = MatchConfig::default_test();
    let scorer = BoostedTreesScorer::new(config.scorer.clone());
    let engine = MatchEngine::new("ghost".into(), 7, config).unwrap();
    let output = engine.run(&store, &store, &scorer, today()).unwrap();

    let err = store.persist(&output).expect_err("unknown run id");
    assert!(matches!(err, MatchError::RunNotInitialized { .. }));
    assert_eq!(store.candidate_count().unwrap(), 0);
}

#[test]
fn failed_persist_rolls_back_every_write() {
    let store = seeded_store("rollback");
    let config = MatchConfig::default_test();
    let scorer = BoostedTreesScorer::new(config.scorer.clone());
    let engine = MatchEngine::new("rollback".into(), 7, config).unwrap();
    let mut output = engine.run(&store, &store, &scorer, today()).unwrap();

    // The employee_skill CHECK constraint rejects the last employee's level,
    // after earlier employees have already been written inside the transaction.
    let last = output.skill_updates.last_mut().expect("employees");
    last.skills[0].level = 11.0;

    assert!(engine.persist(&output, &store).is_err());
    assert!(store.employee_skills("ana").unwrap().is_empty());
    assert_eq!(store.candidate_count().unwrap(), 0);
    assert_eq!(store.event_count("rollback").unwrap(), 0);
    assert!(!store.run_finished("rollback").unwrap());
}
