//! Time estimation tests.

use serde_json::json;
use skillmatch_core::{
    estimation::{apply_estimates, estimate_hours},
    ingest::{normalize_task, TaskRecord},
    model::Task,
};

fn tasks(raw: serde_json::Value) -> Vec<Task> {
    let records: Vec<TaskRecord> = serde_json::from_value(raw).expect("tasks");
    records.iter().map(|r| normalize_task(r).0).collect()
}

fn sample() -> Vec<Task> {
    tasks(json!([
        {"id": 1, "key": "OPS-1", "project": "OPS", "assignee": "ana", "actual_hours": 4.0, "status": "Resolved"},
        {"id": 2, "key": "OPS-2", "project": "OPS", "assignee": "ana", "actual_hours": 6.0, "status": "Closed"},
        {"id": 3, "key": "OPS-3", "project": "OPS", "assignee": "bo",  "actual_hours": 10.0, "status": "Closed"},
        {"id": 4, "key": "OPS-4", "project": "OPS", "assignee": "bo",  "actual_hours": 7.0, "status": "To Do"},
        {"id": 5, "key": "OPS-5", "project": "OPS", "status": "In Progress"},
        {"id": 6, "key": "WEB-1", "project": "WEB", "assignee": "ana", "actual_hours": 2.0},
        {"id": 7, "key": "MISC-1", "assignee": "ana", "actual_hours": 3.0}
    ]))
}

#[test]
fn assignee_mean_within_project() {
    let estimates = estimate_hours(&sample(), 0.05);
    // ana in OPS: (4 + 6) / 2
    assert_eq!(estimates[0].estimated_hours, Some(5.0));
    assert_eq!(estimates[1].estimated_hours, Some(5.0));
    // bo in OPS: (10 + 0) / 2, the To Do task counting as zero
    assert_eq!(estimates[2].estimated_hours, Some(5.0));
    // ana in WEB is independent of OPS
    assert_eq!(estimates[5].estimated_hours, Some(2.0));
    assert_eq!(estimates[5].well_estimated, Some(true));
}

#[test]
fn to_do_tasks_get_zero_hours_and_no_estimate() {
    let estimates = estimate_hours(&sample(), 0.05);
    let todo = &estimates[3];
    assert_eq!(todo.actual_hours, 0.0);
    assert_eq!(todo.estimated_hours, None);
    assert_eq!(todo.well_estimated, None);
}

#[test]
fn unassigned_task_gets_project_mean() {
    let estimates = estimate_hours(&sample(), 0.05);
    // OPS logged hours: 4, 6, 10, 0 → mean 5
    assert_eq!(estimates[4].estimated_hours, Some(5.0));
    assert_eq!(estimates[4].actual_hours, 0.0);
    assert_eq!(estimates[4].well_estimated, Some(false));
}

#[test]
fn tasks_without_project_are_not_estimated() {
    let estimates = estimate_hours(&sample(), 0.05);
    assert_eq!(estimates[6].estimated_hours, None);
    assert_eq!(estimates[6].actual_hours, 3.0);
}

#[test]
fn well_estimated_uses_relative_tolerance() {
    let estimates = estimate_hours(&sample(), 0.05);
    // ana OPS estimate 5.0: 4.0 and 6.0 are both 20% off
    assert_eq!(estimates[0].well_estimated, Some(false));
    let loose = estimate_hours(&sample(), 0.25);
    assert_eq!(loose[0].well_estimated, Some(true));
}

#[test]
fn apply_fills_only_missing_estimates() {
    let mut work = tasks(json!([
        {"id": 1, "key": "OPS-1", "project": "OPS", "assignee": "ana", "actual_hours": 4.0},
        {"id": 2, "key": "OPS-2", "project": "OPS", "assignee": "ana", "actual_hours": 8.0,
         "estimated_hours": 1.5}
    ]));
    let estimates = estimate_hours(&work, 0.05);
    apply_estimates(&mut work, &estimates);
    assert_eq!(work[0].estimated_hours, Some(6.0));
    assert_eq!(work[1].estimated_hours, Some(1.5), "source estimate wins");
}
