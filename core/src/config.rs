use crate::error::{MatchError, MatchResult};
use serde::{Deserialize, Serialize};

/// Hyper-parameters for the reference boosted-trees scorer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScorerConfig {
    pub rounds: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Row fraction drawn per round. 1.0 disables sampling.
    pub subsample: f64,
}

/// Proficiency blend: `level = min + (max - min) * (w_e * exp_norm + w_t * tenure_norm)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProficiencyConfig {
    pub experience_weight: f64,
    pub tenure_weight: f64,
    pub min_level: f64,
    pub max_level: f64,
    /// Employees whose last task is older than this are marked inactive.
    pub active_window_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SelectionConfig {
    pub monthly_quota_hours: f64,
    /// How many top-scored employees are considered per task.
    pub candidate_pool_size: usize,
    pub max_accepted: usize,
    /// Keep walking the ranking past the pool when it under-fills.
    #[serde(default)]
    pub extend_pool_on_shortfall: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextConfig {
    pub dimensions: usize,
    pub max_vocabulary: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EstimationConfig {
    /// Relative band within which an estimate counts as accurate.
    pub tolerance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchConfig {
    pub proficiency: ProficiencyConfig,
    pub selection: SelectionConfig,
    pub text: TextConfig,
    pub scorer: ScorerConfig,
    pub estimation: EstimationConfig,
}

impl MatchConfig {
    /// Load from the data/ directory.
    /// In tests, use MatchConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/assignment/match_config.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: MatchConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> MatchResult<()> {
        let p = &self.proficiency;
        let weights = p.experience_weight + p.tenure_weight;
        if p.experience_weight < 0.0 || p.tenure_weight < 0.0 || (weights - 1.0).abs() > 1e-9 {
            return Err(MatchError::InvalidConfig(format!(
                "proficiency weights must be non-negative and sum to 1, got {weights}"
            )));
        }
        // Stored levels are constrained to [1, 10] by the employee_skill table.
        if !(1.0 <= p.min_level && p.min_level < p.max_level && p.max_level <= 10.0) {
            return Err(MatchError::InvalidConfig(format!(
                "levels must satisfy 1 <= min_level < max_level <= 10, got {}..{}",
                p.min_level, p.max_level
            )));
        }
        let s = &self.selection;
        if !(s.monthly_quota_hours > 0.0) {
            return Err(MatchError::InvalidConfig(
                "monthly_quota_hours must be positive".into(),
            ));
        }
        if s.candidate_pool_size == 0 || s.max_accepted == 0 {
            return Err(MatchError::InvalidConfig(
                "candidate_pool_size and max_accepted must be at least 1".into(),
            ));
        }
        if self.text.dimensions == 0 {
            return Err(MatchError::InvalidConfig(
                "text.dimensions must be at least 1".into(),
            ));
        }
        let sc = &self.scorer;
        if sc.min_samples_leaf == 0 || !(sc.subsample > 0.0 && sc.subsample <= 1.0) {
            return Err(MatchError::InvalidConfig(
                "scorer.min_samples_leaf must be >= 1 and subsample in (0, 1]".into(),
            ));
        }
        Ok(())
    }

    /// Config with hardcoded defaults for use in unit tests.
    /// Smaller scorer than production so test runs stay quick.
    pub fn default_test() -> Self {
        Self {
            scorer: ScorerConfig {
                rounds: 40,
                learning_rate: 0.1,
                max_depth: 3,
                min_samples_leaf: 1,
                subsample: 1.0,
            },
            ..Self::default()
        }
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            proficiency: ProficiencyConfig {
                experience_weight: 0.7,
                tenure_weight: 0.3,
                min_level: 1.0,
                max_level: 10.0,
                active_window_days: 60,
            },
            selection: SelectionConfig {
                monthly_quota_hours: 160.0,
                candidate_pool_size: 3,
                max_accepted: 3,
                extend_pool_on_shortfall: false,
            },
            text: TextConfig {
                dimensions: 5,
                max_vocabulary: 250,
            },
            scorer: ScorerConfig {
                rounds: 200,
                learning_rate: 0.05,
                max_depth: 5,
                min_samples_leaf: 1,
                subsample: 1.0,
            },
            estimation: EstimationConfig { tolerance: 0.05 },
        }
    }
}
