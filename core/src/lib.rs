//! skillmatch core: skill-proficiency model and capacity-aware assignment.

pub mod capacity;
pub mod config;
pub mod eligibility;
pub mod engine;
pub mod error;
pub mod estimation;
pub mod event;
pub mod features;
pub mod ingest;
pub mod model;
pub mod rng;
pub mod scorer;
pub mod selector;
pub mod skill_aggregator;
pub mod source;
pub mod store;
pub mod synthetic;
pub mod tenure;
pub mod text_encoder;
pub mod types;
