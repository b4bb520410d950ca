//! Random Forest Classifier
//!
//! Bagged CART trees on Gini impurity. Each tree sees a bootstrap sample
//! and considers a random subset of ⌊√features⌋ columns per split.
//! Seeded, so the same data and seed always grow the same forest.

use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::logic::dataset::LabeledDataset;
use crate::logic::error::{MlError, MlResult};

const MIN_SAMPLES_SPLIT: usize = 2;

/// Probability above which a row is classified positive
pub const DECISION_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            seed: 42,
        }
    }
}

// ============================================================================
// DECISION TREE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
enum Node {
    Leaf {
        positive: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, Copy)]
struct Split {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

/// Single classification tree stored as a flat node arena (root = 0)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    fn fit(
        features: &Array2<f64>,
        labels: &[bool],
        sample: Vec<usize>,
        max_features: usize,
        rng: &mut StdRng,
    ) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow(features, labels, sample, max_features, rng);
        tree
    }

    fn grow(
        &mut self,
        features: &Array2<f64>,
        labels: &[bool],
        indices: Vec<usize>,
        max_features: usize,
        rng: &mut StdRng,
    ) -> usize {
        let id = self.nodes.len();
        let positives = indices.iter().filter(|&&i| labels[i]).count();
        self.nodes.push(Node::Leaf {
            positive: positives as f64 / indices.len() as f64,
        });

        if positives == 0 || positives == indices.len() || indices.len() < MIN_SAMPLES_SPLIT {
            return id;
        }

        let Some(split) = best_split(features, labels, &indices, max_features, rng) else {
            return id;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| features[[i, split.feature]] <= split.threshold);

        let left = self.grow(features, labels, left_rows, max_features, rng);
        let right = self.grow(features, labels, right_rows, max_features, rng);
        self.nodes[id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        id
    }

    fn positive_fraction(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Leaf { positive } => return *positive,
                Node::Split { feature, threshold, left, right } => {
                    id = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

fn gini(positives: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let p = positives as f64 / total as f64;
    2.0 * p * (1.0 - p)
}

/// Lowest weighted Gini split over a random feature subset.
/// Keeps drawing features past `max_features` until a splittable one is found.
fn best_split(
    features: &Array2<f64>,
    labels: &[bool],
    indices: &[usize],
    max_features: usize,
    rng: &mut StdRng,
) -> Option<Split> {
    let mut candidates: Vec<usize> = (0..features.ncols()).collect();
    candidates.shuffle(rng);

    let total = indices.len();
    let total_positives = indices.iter().filter(|&&i| labels[i]).count();
    let mut best: Option<Split> = None;

    for (visited, &feature) in candidates.iter().enumerate() {
        if visited >= max_features && best.is_some() {
            break;
        }

        let mut values: Vec<(f64, bool)> = indices
            .iter()
            .map(|&i| (features[[i, feature]], labels[i]))
            .collect();
        values.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut left_positives = 0;
        for k in 1..total {
            if values[k - 1].1 {
                left_positives += 1;
            }
            if values[k].0 <= values[k - 1].0 {
                continue;
            }

            let right_n = total - k;
            let impurity = (k as f64 * gini(left_positives, k)
                + right_n as f64 * gini(total_positives - left_positives, right_n))
                / total as f64;

            if best.map_or(true, |b| impurity < b.impurity) {
                let mut threshold = (values[k - 1].0 + values[k].0) / 2.0;
                if threshold >= values[k].0 {
                    threshold = values[k - 1].0;
                }
                best = Some(Split {
                    feature,
                    threshold,
                    impurity,
                });
            }
        }
    }

    best
}

// ============================================================================
// FOREST
// ============================================================================

/// Binary classifier: will the asset fail soon?
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    n_features: usize,
    trees: Vec<DecisionTree>,
}

impl RandomForestClassifier {
    pub fn fit(dataset: &LabeledDataset, params: &ForestParams) -> MlResult<Self> {
        if dataset.is_empty() {
            return Err(MlError::DataUnavailable(
                "cannot fit classifier on an empty dataset".to_string(),
            ));
        }
        if params.n_estimators == 0 {
            return Err(MlError::Computation(
                "classifier needs at least one estimator".to_string(),
            ));
        }

        let features = dataset.features();
        let labels = dataset.labels();
        let n_rows = dataset.len();
        let n_features = features.ncols();
        let max_features = ((n_features as f64).sqrt() as usize).max(1);

        let mut rng = StdRng::seed_from_u64(params.seed);
        let trees = (0..params.n_estimators)
            .map(|_| {
                let mut tree_rng = StdRng::seed_from_u64(rng.gen::<u64>());
                let sample: Vec<usize> =
                    (0..n_rows).map(|_| tree_rng.gen_range(0..n_rows)).collect();
                DecisionTree::fit(features, labels, sample, max_features, &mut tree_rng)
            })
            .collect();

        Ok(Self { n_features, trees })
    }

    /// Positive-class probability, averaged over trees
    pub fn predict_proba(&self, features: &[f64]) -> MlResult<f64> {
        if features.len() != self.n_features {
            return Err(MlError::Computation(format!(
                "expected {} features, got {}",
                self.n_features,
                features.len()
            )));
        }
        Ok(self.proba_row(ArrayView1::from(features)))
    }

    /// `(will_fail, probability)` for one row
    pub fn predict(&self, features: &[f64]) -> MlResult<(bool, f64)> {
        let probability = self.predict_proba(features)?;
        Ok((probability > DECISION_THRESHOLD, probability))
    }

    /// Fraction of rows whose predicted class matches the label
    pub fn accuracy(&self, dataset: &LabeledDataset) -> f64 {
        if dataset.is_empty() {
            return 0.0;
        }
        let correct = dataset
            .labels()
            .iter()
            .enumerate()
            .filter(|(i, label)| (self.proba_row(dataset.row(*i)) > DECISION_THRESHOLD) == **label)
            .count();
        correct as f64 / dataset.len() as f64
    }

    pub fn n_estimators(&self) -> usize {
        self.trees.len()
    }

    fn proba_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.positive_fraction(row)).sum();
        sum / self.trees.len() as f64
    }
}
