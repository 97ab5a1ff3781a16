use thiserror::Error;

#[derive(Error, Debug)]
pub enum MatchError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Missing skill, level or date data. Degraded locally, never fatal.
    #[error("Data gap on {entity} '{id}': {detail}")]
    DataGap {
        entity: &'static str,
        id: String,
        detail: String,
    },

    /// A single skill entry that cannot be parsed into (name, level).
    #[error("Malformed skill entry on {owner}: {raw}")]
    MalformedRecord { owner: String, raw: String },

    /// A collaborator could not supply task or employee data. Aborts the run.
    #[error("Upstream source '{source_name}' failed: {reason}")]
    UpstreamSource { source_name: String, reason: String },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Run '{run_id}' not initialized")]
    RunNotInitialized { run_id: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MatchError {
    /// True for errors the pipeline absorbs by skipping a record.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::DataGap { .. } | Self::MalformedRecord { .. })
    }
}

pub type MatchResult<T> = Result<T, MatchError>;
