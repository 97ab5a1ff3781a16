//! Proficiency model tests: level formula, normalization, replacement.

use chrono::NaiveDate;
use serde_json::json;
use skillmatch_core::{
    config::MatchConfig,
    engine::MatchEngine,
    event::MatchEvent,
    rng::{RngBank, StreamSlot},
    scorer::BoostedTreesScorer,
    source::JsonDataset,
    synthetic::{self, SyntheticShape},
};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()
}

fn run(dataset: &JsonDataset) -> skillmatch_core::engine::RunOutput {
    let config = MatchConfig::default_test();
    let scorer = BoostedTreesScorer::new(config.scorer.clone());
    let engine = MatchEngine::new("levels-test".into(), 11, config).expect("engine");
    engine
        .run(dataset, dataset, &scorer, today())
        .expect("run succeeds")
}

/// One skill, 4 hours of history, 30 days tenure against a 300 day fleet max.
#[test]
fn single_skill_thirty_day_tenure_gives_4_42() {
    let dataset: JsonDataset = serde_json::from_value(json!({
        "employees": [
            {"id": "ana", "skills": []},
            {"id": "bo",  "skills": []}
        ],
        "tasks": [
            {"id": 1, "key": "OPS-1", "skills": [["API", 2]], "date": "2024-06-01 10:00:00",
             "assignee": "ana", "actual_hours": 4.0, "status": "Resolved"},
            {"id": 2, "key": "OPS-2", "skills": [["SQL", 2]], "date": "2023-09-05 10:00:00",
             "assignee": "bo", "actual_hours": 12.0, "status": "Closed"}
        ]
    }))
    .expect("dataset");

    let output = run(&dataset);
    let ana = output.skill_update("ana").expect("ana updated");
    assert_eq!(ana.tenure_days, 30);
    assert_eq!(ana.skills.len(), 1);
    assert_eq!(ana.skills[0].name, "API");
    assert!(
        (ana.skills[0].level - 4.42).abs() < 1e-9,
        "expected 4.42, got {}",
        ana.skills[0].level
    );

    // bo holds the fleet max tenure: tenure_norm 1.0, experience_norm 0.5.
    let bo = output.skill_update("bo").expect("bo updated");
    assert_eq!(bo.tenure_days, 300);
    assert!((bo.skills[0].level - (1.0 + 9.0 * (0.35 + 0.3))).abs() < 1e-9);
}

#[test]
fn equal_experience_normalizes_to_midpoint() {
    let dataset: JsonDataset = serde_json::from_value(json!({
        "employees": [{"id": "ana", "skills": []}],
        "tasks": [
            {"id": 1, "key": "OPS-1", "skills": [["API", 1], ["SQL", 1]],
             "date": "2024-06-01", "assignee": "ana", "actual_hours": 5.0}
        ]
    }))
    .expect("dataset");

    let output = run(&dataset);
    let ana = output.skill_update("ana").expect("ana updated");
    assert_eq!(ana.skills.len(), 2);
    // Sole employee: tenure_norm 1.0.
    for s in &ana.skills {
        assert!((s.level - (1.0 + 9.0 * (0.35 + 0.3))).abs() < 1e-9, "{s:?}");
    }
}

#[test]
fn zero_experience_skill_is_absent_and_old_levels_replaced() {
    let dataset: JsonDataset = serde_json::from_value(json!({
        "employees": [
            {"id": "ana", "skills": [["Legacy", 9], ["API", 2]]},
            {"id": "cy",  "skills": [["Cobol", 7]]}
        ],
        "tasks": [
            {"id": 1, "key": "OPS-1", "skills": [["API", 1]], "date": "2024-06-01",
             "assignee": "ana", "actual_hours": 8.0},
            {"id": 2, "key": "OPS-2", "skills": [["Docs", 1]], "date": "2024-06-02",
             "assignee": "ana", "actual_hours": 0.0}
        ]
    }))
    .expect("dataset");

    let output = run(&dataset);
    let ana = output.skill_update("ana").expect("ana updated");
    let names: Vec<&str> = ana.skills.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["API"], "Legacy must be replaced, Docs never emitted");

    // No history: source skills kept untouched.
    let cy = output.skill_update("cy").expect("cy kept");
    assert_eq!(cy.skills.len(), 1);
    assert_eq!(cy.skills[0].level, 7.0);
}

/// Experience logged only on undated tasks still replaces the source levels,
/// with tenure contributing nothing, and the missing tenure is reported.
#[test]
fn undated_experience_replaces_levels_without_tenure() {
    let dataset: JsonDataset = serde_json::from_value(json!({
        "employees": [{"id": "ana", "skills": [["Legacy", 9]]}],
        "tasks": [
            {"id": 1, "key": "OPS-1", "skills": [["API", 1]],
             "assignee": "ana", "actual_hours": 6.0}
        ]
    }))
    .expect("dataset");

    let output = run(&dataset);
    let ana = output.skill_update("ana").expect("ana updated");
    assert_eq!(ana.skills.len(), 1);
    assert_eq!(ana.skills[0].name, "API");
    assert!((ana.skills[0].level - (1.0 + 9.0 * 0.35)).abs() < 1e-9);

    assert!(output.events.iter().any(|e| matches!(
        e,
        MatchEvent::RecordIssue { owner, kind, .. } if owner == "employee ana" && kind == "data_gap"
    )));
}

#[test]
fn activity_derived_from_recent_history() {
    let dataset: JsonDataset = serde_json::from_value(json!({
        "employees": [
            {"id": "recent", "skills": [], "active": false},
            {"id": "stale",  "skills": [], "active": true},
            {"id": "fresh",  "skills": [["API", 3]], "active": true}
        ],
        "tasks": [
            {"id": 1, "key": "OPS-1", "skills": [["API", 1]], "date": "2024-06-20",
             "assignee": "recent", "actual_hours": 3.0},
            {"id": 2, "key": "OPS-2", "skills": [["API", 1]], "date": "2024-03-01",
             "assignee": "stale", "actual_hours": 3.0}
        ]
    }))
    .expect("dataset");

    let output = run(&dataset);
    assert!(output.skill_update("recent").unwrap().active);
    assert!(!output.skill_update("stale").unwrap().active);
    assert!(output.skill_update("fresh").unwrap().active, "no history keeps source flag");
}

#[test]
fn every_level_stays_within_bounds() {
    let shape = SyntheticShape::new(30, 400, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    let dataset = synthetic::generate(&shape, &mut RngBank::new(5).for_stream(StreamSlot::Synthetic));
    let output = run(&dataset);

    let mut checked = 0;
    for update in &output.skill_updates {
        for s in &update.skills {
            assert!(
                (1.0..=10.0).contains(&s.level),
                "{} {} out of range: {}",
                update.employee_id,
                s.name,
                s.level
            );
            checked += 1;
        }
    }
    assert!(checked > 0, "synthetic data produced no skills at all");
}
