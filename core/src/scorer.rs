//! Scorer contract and the reference boosted-trees implementation.
//!
//! The selector only ever sees `FitModel::predict`. Any regressor that
//! can be trained on `(FeatureVector, label)` pairs is substitutable.

use crate::{
    config::ScorerConfig,
    error::{MatchError, MatchResult},
    features::FeatureVector,
    rng::StreamRng,
};

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSample {
    pub features: FeatureVector,
    pub label: f64,
}

/// Suitability label: faster historical completion → higher label.
/// `(max - actual) / max`, or 0.0 when no hours were ever logged.
pub fn completion_label(max_observed_hours: f64, actual_hours: f64) -> f64 {
    if max_observed_hours <= 0.0 {
        return 0.0;
    }
    (max_observed_hours - actual_hours) / max_observed_hours
}

/// A trained model. Opaque to everything but `predict`.
pub trait FitModel: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> f64;
}

/// The training side of the contract.
pub trait Scorer: Send + Sync {
    /// Unique stable name, recorded in the event log.
    fn name(&self) -> &'static str;

    fn train(&self, samples: &[TrainingSample], rng: &mut StreamRng)
        -> MatchResult<Box<dyn FitModel>>;
}

// ── Standardization ───────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Standardizer {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl Standardizer {
    fn fit(rows: &[&[f64]], width: usize) -> Self {
        let n = rows.len().max(1) as f64;
        let mut mean = vec![0.0; width];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row.iter()) {
                *m += v / n;
            }
        }
        let mut var = vec![0.0; width];
        for row in rows {
            for ((s, v), m) in var.iter_mut().zip(row.iter()).zip(&mean) {
                *s += (v - m).powi(2) / n;
            }
        }
        // Constant columns keep unit scale.
        let scale = var
            .into_iter()
            .map(|v| if v > 0.0 { v.sqrt() } else { 1.0 })
            .collect();
        Self { mean, scale }
    }

    fn transform(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(v, (m, s))| (v - m) / s)
            .collect()
    }
}

// ── Regression tree ───────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone)]
struct RegressionTree {
    nodes: Vec<Node>,
}

struct TreeParams {
    max_depth: usize,
    min_samples_leaf: usize,
}

impl RegressionTree {
    fn fit(x: &[Vec<f64>], target: &[f64], rows: Vec<usize>, params: &TreeParams) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow(x, target, rows, 0, params);
        tree
    }

    /// Grow a subtree; returns the index of its root node.
    fn grow(
        &mut self,
        x: &[Vec<f64>],
        target: &[f64],
        rows: Vec<usize>,
        depth: usize,
        params: &TreeParams,
    ) -> usize {
        let mean = if rows.is_empty() {
            0.0
        } else {
            rows.iter().map(|&i| target[i]).sum::<f64>() / rows.len() as f64
        };
        let index = self.nodes.len();
        self.nodes.push(Node::Leaf(mean));

        if depth >= params.max_depth || rows.len() < 2 * params.min_samples_leaf {
            return index;
        }
        let Some((feature, threshold)) = best_split(x, target, &rows, params.min_samples_leaf)
        else {
            return index;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
            rows.into_iter().partition(|&i| x[i][feature] <= threshold);
        let left = self.grow(x, target, left_rows, depth + 1, params);
        let right = self.grow(x, target, right_rows, depth + 1, params);
        self.nodes[index] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        index
    }

    fn predict(&self, row: &[f64]) -> f64 {
        let mut at = 0;
        loop {
            match &self.nodes[at] {
                Node::Leaf(v) => return *v,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    at = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

/// Exhaustive variance-reduction split search. Returns `None` when no split
/// improves on the parent.
fn best_split(
    x: &[Vec<f64>],
    target: &[f64],
    rows: &[usize],
    min_leaf: usize,
) -> Option<(usize, f64)> {
    let n = rows.len();
    let total: f64 = rows.iter().map(|&i| target[i]).sum();
    let parent = total * total / n as f64;
    let width = x[rows[0]].len();

    let mut best: Option<(usize, f64, f64)> = None;
    let mut sorted = rows.to_vec();

    for feature in 0..width {
        sorted.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));
        let mut left_sum = 0.0;
        for k in 1..n {
            left_sum += target[sorted[k - 1]];
            let (lo, hi) = (x[sorted[k - 1]][feature], x[sorted[k]][feature]);
            if k < min_leaf || n - k < min_leaf || lo == hi {
                continue;
            }
            let right_sum = total - left_sum;
            let gain = left_sum * left_sum / k as f64 + right_sum * right_sum / (n - k) as f64
                - parent;
            if gain > 1e-12 && best.map_or(true, |(_, _, g)| gain > g) {
                best = Some((feature, (lo + hi) / 2.0, gain));
            }
        }
    }
    best.map(|(feature, threshold, _)| (feature, threshold))
}

// ── Boosted ensemble ──────────────────────────────────────────────

/// Standardize, then fit gradient-boosted regression trees on squared loss.
#[derive(Debug, Clone)]
pub struct BoostedTreesScorer {
    config: ScorerConfig,
}

impl BoostedTreesScorer {
    pub fn new(config: ScorerConfig) -> Self {
        Self { config }
    }
}

#[derive(Debug, Clone)]
pub struct BoostedTreesModel {
    width: usize,
    scaler: Standardizer,
    base: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
}

impl BoostedTreesModel {
    pub fn rounds(&self) -> usize {
        self.trees.len()
    }
}

impl FitModel for BoostedTreesModel {
    fn predict(&self, features: &FeatureVector) -> f64 {
        if features.len() != self.width {
            log::warn!(
                "feature width {} does not match trained width {}",
                features.len(),
                self.width
            );
            return self.base;
        }
        let row = self.scaler.transform(features.as_slice());
        self.base
            + self
                .trees
                .iter()
                .map(|t| self.learning_rate * t.predict(&row))
                .sum::<f64>()
    }
}

impl Scorer for BoostedTreesScorer {
    fn name(&self) -> &'static str {
        "boosted_trees"
    }

    fn train(
        &self,
        samples: &[TrainingSample],
        rng: &mut StreamRng,
    ) -> MatchResult<Box<dyn FitModel>> {
        let width = samples.first().map(|s| s.features.len()).unwrap_or(0);
        if let Some(bad) = samples.iter().find(|s| s.features.len() != width) {
            return Err(MatchError::Other(anyhow::anyhow!(
                "training samples disagree on width: {} vs {width}",
                bad.features.len()
            )));
        }

        let raw: Vec<&[f64]> = samples.iter().map(|s| s.features.as_slice()).collect();
        let scaler = Standardizer::fit(&raw, width);
        let x: Vec<Vec<f64>> = raw.iter().map(|r| scaler.transform(r)).collect();
        let y: Vec<f64> = samples.iter().map(|s| s.label).collect();

        let base = if y.is_empty() {
            0.0
        } else {
            y.iter().sum::<f64>() / y.len() as f64
        };

        let mut model = BoostedTreesModel {
            width,
            scaler,
            base,
            learning_rate: self.config.learning_rate,
            trees: Vec::with_capacity(self.config.rounds),
        };
        if samples.is_empty() {
            log::warn!("no training samples; scorer predicts a constant");
            return Ok(Box::new(model));
        }

        let params = TreeParams {
            max_depth: self.config.max_depth,
            min_samples_leaf: self.config.min_samples_leaf,
        };
        let mut prediction = vec![base; y.len()];

        for _ in 0..self.config.rounds {
            let residual: Vec<f64> = y.iter().zip(&prediction).map(|(t, p)| t - p).collect();
            let rows: Vec<usize> = if self.config.subsample < 1.0 {
                (0..y.len()).filter(|_| rng.chance(self.config.subsample)).collect()
            } else {
                (0..y.len()).collect()
            };
            if rows.is_empty() {
                continue;
            }
            let tree = RegressionTree::fit(&x, &residual, rows, &params);
            for (p, row) in prediction.iter_mut().zip(&x) {
                *p += self.config.learning_rate * tree.predict(row);
            }
            model.trees.push(tree);
        }

        log::debug!(
            "boosted trees trained: {} samples, {} rounds, width {width}",
            samples.len(),
            model.rounds()
        );
        Ok(Box::new(model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchConfig;
    use crate::rng::{RngBank, StreamSlot};

    fn sample(x: &[f64], label: f64) -> TrainingSample {
        TrainingSample {
            features: FeatureVector::new(x.to_vec()),
            label,
        }
    }

    fn rng() -> StreamRng {
        RngBank::new(3).for_stream(StreamSlot::Scorer)
    }

    #[test]
    fn label_inverts_hours() {
        assert_eq!(completion_label(40.0, 10.0), 0.75);
        assert_eq!(completion_label(40.0, 40.0), 0.0);
        assert_eq!(completion_label(0.0, 0.0), 0.0);
    }

    #[test]
    fn learns_a_step_function() {
        let samples: Vec<TrainingSample> = (0..20)
            .map(|i| {
                let x = i as f64;
                sample(&[x, 1.0], if x < 10.0 { 0.2 } else { 0.9 })
            })
            .collect();
        let scorer = BoostedTreesScorer::new(MatchConfig::default_test().scorer);
        let model = scorer.train(&samples, &mut rng()).unwrap();
        let low = model.predict(&FeatureVector::new(vec![2.0, 1.0]));
        let high = model.predict(&FeatureVector::new(vec![17.0, 1.0]));
        assert!((low - 0.2).abs() < 0.05, "low={low}");
        assert!((high - 0.9).abs() < 0.05, "high={high}");
    }

    #[test]
    fn empty_training_set_predicts_constant() {
        let scorer = BoostedTreesScorer::new(MatchConfig::default_test().scorer);
        let model = scorer.train(&[], &mut rng()).unwrap();
        assert_eq!(model.predict(&FeatureVector::new(vec![])), 0.0);
    }

    #[test]
    fn ragged_samples_rejected() {
        let scorer = BoostedTreesScorer::new(MatchConfig::default_test().scorer);
        let samples = vec![sample(&[1.0, 2.0], 0.5), sample(&[1.0], 0.5)];
        assert!(scorer.train(&samples, &mut rng()).is_err());
    }

    #[test]
    fn training_is_deterministic() {
        let mut cfg = MatchConfig::default_test().scorer;
        cfg.subsample = 0.7;
        let samples: Vec<TrainingSample> = (0..30)
            .map(|i| sample(&[i as f64, (i % 4) as f64], (i % 7) as f64 / 7.0))
            .collect();
        let probe = FeatureVector::new(vec![11.0, 2.0]);
        let a = BoostedTreesScorer::new(cfg.clone())
            .train(&samples, &mut rng())
            .unwrap()
            .predict(&probe);
        let b = BoostedTreesScorer::new(cfg)
            .train(&samples, &mut rng())
            .unwrap()
            .predict(&probe);
        assert_eq!(a.to_bits(), b.to_bits());
    }
}
