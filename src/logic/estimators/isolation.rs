//! Isolation Forest
//!
//! Anomalies are isolated by fewer random splits than normal points.
//! Score is `2^(-E[h(x)] / c(ψ))`; rows scoring above the training
//! `(1 - contamination)` quantile are labelled anomalous.

use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::logic::error::{MlError, MlResult};

const MAX_SAMPLES: usize = 256;
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Label for an anomalous row
pub const ANOMALY: i8 = -1;
/// Label for a normal row
pub const NORMAL: i8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IsolationParams {
    pub n_estimators: usize,
    pub contamination: f64,
    pub seed: u64,
}

impl Default for IsolationParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            contamination: 0.2,
            seed: 42,
        }
    }
}

/// Expected path length of an unsuccessful BST search over `n` points
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Linear-interpolated quantile, `q` in [0, 1]
fn quantile(values: &[f64], q: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

// ============================================================================
// ISOLATION TREE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
enum IsoNode {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct IsolationTree {
    nodes: Vec<IsoNode>,
}

impl IsolationTree {
    fn fit(features: &Array2<f64>, sample: Vec<usize>, max_depth: usize, rng: &mut StdRng) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow(features, sample, 0, max_depth, rng);
        tree
    }

    fn grow(
        &mut self,
        features: &Array2<f64>,
        indices: Vec<usize>,
        depth: usize,
        max_depth: usize,
        rng: &mut StdRng,
    ) -> usize {
        let id = self.nodes.len();
        self.nodes.push(IsoNode::Leaf { size: indices.len() });

        if depth >= max_depth || indices.len() <= 1 {
            return id;
        }

        // Only features that still vary inside this node can isolate anything
        let spans: Vec<(usize, f64, f64)> = (0..features.ncols())
            .filter_map(|feature| {
                let (min, max) = indices
                    .iter()
                    .map(|&i| features[[i, feature]])
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                        (lo.min(v), hi.max(v))
                    });
                (max > min).then_some((feature, min, max))
            })
            .collect();

        if spans.is_empty() {
            return id;
        }

        let (feature, min, max) = spans[rng.gen_range(0..spans.len())];
        let threshold = rng.gen_range(min..max);

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| features[[i, feature]] <= threshold);

        let left = self.grow(features, left_rows, depth + 1, max_depth, rng);
        let right = self.grow(features, right_rows, depth + 1, max_depth, rng);
        self.nodes[id] = IsoNode::Split {
            feature,
            threshold,
            left,
            right,
        };
        id
    }

    fn path_length(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut id = 0;
        let mut depth = 0.0;
        loop {
            match &self.nodes[id] {
                IsoNode::Leaf { size } => return depth + average_path_length(*size),
                IsoNode::Split { feature, threshold, left, right } => {
                    id = if row[*feature] <= *threshold { *left } else { *right };
                    depth += 1.0;
                }
            }
        }
    }
}

// ============================================================================
// FOREST
// ============================================================================

/// Unsupervised outlier detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationForest {
    n_features: usize,
    sample_size: usize,
    contamination: f64,
    threshold: f64,
    trees: Vec<IsolationTree>,
}

impl IsolationForest {
    pub fn fit(features: &Array2<f64>, params: &IsolationParams) -> MlResult<Self> {
        let n_rows = features.nrows();
        if n_rows == 0 {
            return Err(MlError::DataUnavailable(
                "cannot fit outlier detector on an empty dataset".to_string(),
            ));
        }
        if params.n_estimators == 0 {
            return Err(MlError::Computation(
                "outlier detector needs at least one estimator".to_string(),
            ));
        }
        if !(params.contamination > 0.0 && params.contamination <= 0.5) {
            return Err(MlError::Computation(format!(
                "contamination must be in (0, 0.5], got {}",
                params.contamination
            )));
        }

        let sample_size = n_rows.min(MAX_SAMPLES);
        let max_depth = (sample_size as f64).log2().ceil() as usize;

        let mut rng = StdRng::seed_from_u64(params.seed);
        let trees = (0..params.n_estimators)
            .map(|_| {
                let mut tree_rng = StdRng::seed_from_u64(rng.gen::<u64>());
                let sample =
                    rand::seq::index::sample(&mut tree_rng, n_rows, sample_size).into_vec();
                IsolationTree::fit(features, sample, max_depth, &mut tree_rng)
            })
            .collect();

        let mut forest = Self {
            n_features: features.ncols(),
            sample_size,
            contamination: params.contamination,
            threshold: 0.0,
            trees,
        };

        let scores: Vec<f64> = features
            .rows()
            .into_iter()
            .map(|row| forest.score_row(row))
            .collect();
        forest.threshold = quantile(&scores, 1.0 - params.contamination);
        Ok(forest)
    }

    /// Anomaly score in (0, 1]; higher is more anomalous
    pub fn score(&self, features: &[f64]) -> MlResult<f64> {
        if features.len() != self.n_features {
            return Err(MlError::Computation(format!(
                "expected {} features, got {}",
                self.n_features,
                features.len()
            )));
        }
        Ok(self.score_row(ArrayView1::from(features)))
    }

    /// `-1` for anomaly, `1` for normal
    pub fn predict(&self, features: &[f64]) -> MlResult<i8> {
        let score = self.score(features)?;
        Ok(if score > self.threshold { ANOMALY } else { NORMAL })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn contamination(&self) -> f64 {
        self.contamination
    }

    pub fn n_estimators(&self) -> usize {
        self.trees.len()
    }

    fn score_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mean_path: f64 =
            self.trees.iter().map(|t| t.path_length(row)).sum::<f64>() / self.trees.len() as f64;
        let norm = average_path_length(self.sample_size).max(1.0);
        2f64.powf(-mean_path / norm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_path_length() {
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        assert!(average_path_length(256) > average_path_length(16));
    }

    #[test]
    fn test_quantile_interpolates() {
        let values = [4.0, 1.0, 3.0, 2.0, 5.0];
        assert_eq!(quantile(&values, 0.0), 1.0);
        assert_eq!(quantile(&values, 1.0), 5.0);
        assert!((quantile(&values, 0.8) - 4.2).abs() < 1e-12);
    }
}
