//! skillmatch-runner: headless batch runner for the assignment pipeline.
//!
//! Usage:
//!   skillmatch-runner --db match.db --today 2024-07-01
//!   skillmatch-runner --db match.db --input dataset.json --seed 7
//!   skillmatch-runner --demo-employees 25 --demo-tasks 400 --output run.json

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use skillmatch_core::{
    config::MatchConfig,
    engine::{MatchEngine, RunOutput},
    rng::{RngBank, StreamSlot},
    scorer::BoostedTreesScorer,
    source::JsonDataset,
    store::MatchStore,
    synthetic::{self, SyntheticShape},
};
use std::env;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let demo_employees = parse_arg(&args, "--demo-employees", 0usize);
    let demo_tasks = parse_arg(&args, "--demo-tasks", 0usize);
    let db = flag_value(&args, "--db").unwrap_or(":memory:");
    let data_dir = flag_value(&args, "--data-dir").unwrap_or("./data");
    let input = flag_value(&args, "--input");
    let today = match flag_value(&args, "--today") {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .with_context(|| format!("--today expects YYYY-MM-DD, got {raw}"))?,
        None => chrono::Local::now().date_naive(),
    };

    println!("skillmatch-runner");
    println!("  seed:      {seed}");
    println!("  today:     {today}");
    println!("  db:        {db}");
    println!("  data_dir:  {data_dir}");
    println!();

    let config = MatchConfig::load(data_dir)?;
    let store = MatchStore::open(db)?;
    store.migrate()?;

    if let Some(path) = input {
        let dataset = JsonDataset::load(path)?;
        store.seed_dataset(&dataset)?;
        log::info!("loaded {path}");
    } else if demo_employees > 0 || demo_tasks > 0 {
        let shape = SyntheticShape::new(demo_employees, demo_tasks, today - Duration::days(180));
        let mut rng = RngBank::new(seed).for_stream(StreamSlot::Synthetic);
        store.seed_dataset(&synthetic::generate(&shape, &mut rng))?;
        log::info!("seeded synthetic workforce: {demo_employees} employees, {demo_tasks} tasks");
    }

    let run_id = uuid::Uuid::new_v4().to_string();
    store.insert_run(&run_id, seed, env!("CARGO_PKG_VERSION"), &today.to_string())?;

    let scorer = BoostedTreesScorer::new(config.scorer.clone());
    let engine = MatchEngine::new(run_id, seed, config)?;
    let output = engine.run(&store, &store, &scorer, today)?;
    engine.persist(&output, &store)?;

    if let Some(path) = flag_value(&args, "--output") {
        std::fs::write(path, serde_json::to_string_pretty(&output)?)
            .with_context(|| format!("cannot write {path}"))?;
    }
    print_summary(&output);
    Ok(())
}

fn print_summary(output: &RunOutput) {
    let skipped = output.events.iter().filter(|e| {
        matches!(e, skillmatch_core::event::MatchEvent::TaskSkipped { .. })
    });
    let active = output.skill_updates.iter().filter(|u| u.active).count();
    let unfilled = output
        .assignments
        .iter()
        .filter(|a| a.candidates.is_empty())
        .count();
    let hits = output
        .assignments
        .iter()
        .filter(|a| a.assignee_in_candidates)
        .count();

    println!("=== RUN SUMMARY ===");
    println!("  run_id:          {}", output.run_id);
    println!("  employees:       {} ({active} active)", output.skill_updates.len());
    println!("  tasks assigned:  {}", output.assignments.len());
    println!("  tasks skipped:   {}", skipped.count());
    println!("  unfilled tasks:  {unfilled}");
    println!("  candidates:      {}", output.accepted_candidates());
    println!("  assignee hits:   {hits}");
    println!("  ledger entries:  {}", output.ledger.len());

    let well = output
        .estimates
        .iter()
        .filter(|e| e.well_estimated == Some(true))
        .count();
    let estimated = output
        .estimates
        .iter()
        .filter(|e| e.estimated_hours.is_some())
        .count();
    println!("  well estimated:  {well}/{estimated}");

    if let Some(busiest) = output
        .ledger
        .iter()
        .max_by(|a, b| a.hours.total_cmp(&b.hours))
    {
        println!(
            "  busiest month:   {} in {} ({:.1}h)",
            busiest.employee_id, busiest.month_key, busiest.hours
        );
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
