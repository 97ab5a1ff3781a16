//! Text components of the feature vector.
//!
//! TF-IDF over the task corpus, projected down to a fixed dimensionality
//! with a seeded ±1 random projection. Fitted once per run; the same fitted
//! encoder serves training and inference.

use crate::rng::StreamRng;
use std::collections::BTreeMap;

/// Pluggable text-vector backend. Dimensionality is fixed at construction.
pub trait TextEncoder: Send + Sync {
    fn dims(&self) -> usize;
    fn encode(&self, text: &str) -> Vec<f64>;
}

#[derive(Debug, Clone)]
pub struct TfidfProjector {
    dims: usize,
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
    /// `dims` rows × vocabulary columns.
    projection: Vec<Vec<f64>>,
}

impl TfidfProjector {
    /// Fit vocabulary and idf on `corpus`, keeping at most `max_vocabulary`
    /// terms by document frequency (ties broken alphabetically).
    pub fn fit(corpus: &[&str], max_vocabulary: usize, dims: usize, rng: &mut StreamRng) -> Self {
        let mut doc_freq: BTreeMap<String, usize> = BTreeMap::new();
        for doc in corpus {
            let mut seen: Vec<String> = tokenize(doc);
            seen.sort();
            seen.dedup();
            for term in seen {
                *doc_freq.entry(term).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<(String, usize)> = doc_freq.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(max_vocabulary);

        let n_docs = corpus.len() as f64;
        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::with_capacity(ranked.len());
        for (index, (term, df)) in ranked.into_iter().enumerate() {
            // smooth idf: ln((1 + n) / (1 + df)) + 1
            idf.push(((1.0 + n_docs) / (1.0 + df as f64)).ln() + 1.0);
            vocabulary.insert(term, index);
        }

        let scale = 1.0 / (dims as f64).sqrt();
        let projection = (0..dims)
            .map(|_| {
                (0..idf.len())
                    .map(|_| if rng.chance(0.5) { scale } else { -scale })
                    .collect()
            })
            .collect();

        log::debug!(
            "text encoder fitted: {} docs, {} terms, {} dims",
            corpus.len(),
            idf.len(),
            dims
        );

        Self {
            dims,
            vocabulary,
            idf,
            projection,
        }
    }

    pub fn vocabulary_len(&self) -> usize {
        self.idf.len()
    }

    fn tfidf(&self, text: &str) -> Vec<f64> {
        let mut weights = vec![0.0; self.idf.len()];
        for token in tokenize(text) {
            if let Some(&i) = self.vocabulary.get(&token) {
                weights[i] += 1.0;
            }
        }
        for (w, idf) in weights.iter_mut().zip(&self.idf) {
            *w *= idf;
        }
        l2_normalize(&mut weights);
        weights
    }
}

impl TextEncoder for TfidfProjector {
    fn dims(&self) -> usize {
        self.dims
    }

    fn encode(&self, text: &str) -> Vec<f64> {
        let weights = self.tfidf(text);
        self.projection
            .iter()
            .map(|row| row.iter().zip(&weights).map(|(p, w)| p * w).sum())
            .collect()
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() >= 2)
        .map(str::to_string)
        .collect()
}

fn l2_normalize(vec: &mut [f64]) {
    let norm = vec.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > 0.0 {
        for value in vec.iter_mut() {
            *value /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{RngBank, StreamSlot};

    fn fit(corpus: &[&str], seed: u64) -> TfidfProjector {
        let mut rng = RngBank::new(seed).for_stream(StreamSlot::TextEncoder);
        TfidfProjector::fit(corpus, 250, 5, &mut rng)
    }

    const CORPUS: [&str; 3] = [
        "Fix login API timeout",
        "Add index to orders database table",
        "API rate limiting for login endpoint",
    ];

    #[test]
    fn output_has_fixed_dimensionality() {
        let enc = fit(&CORPUS, 1);
        assert_eq!(enc.encode("login API").len(), 5);
        assert_eq!(enc.encode("").len(), 5);
        assert!(enc.encode("").iter().all(|v| *v == 0.0));
        assert!(enc.encode("words nobody used").iter().all(|v| *v == 0.0));
    }

    #[test]
    fn vocabulary_cap_respected() {
        let mut rng = RngBank::new(1).for_stream(StreamSlot::TextEncoder);
        let enc = TfidfProjector::fit(&CORPUS, 3, 5, &mut rng);
        assert_eq!(enc.vocabulary_len(), 3);
    }

    #[test]
    fn same_seed_same_vectors() {
        let a = fit(&CORPUS, 9).encode("login API timeout");
        let b = fit(&CORPUS, 9).encode("login API timeout");
        assert_eq!(a, b);
    }

    #[test]
    fn tokenizer_drops_single_chars() {
        assert_eq!(tokenize("a API, x-ray!"), vec!["api", "ray"]);
        assert_eq!(tokenize("é café ñ"), vec!["café"]);
    }
}
