//! Trainer - fits the failure classifier and the outlier detector
//!
//! Pure training: no disk access. Persistence is owned by the model store.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::config::ModelConfig;
use super::dataset::LabeledDataset;
use super::error::{MlError, MlResult};
use super::estimators::{ForestParams, IsolationForest, IsolationParams, RandomForestClassifier};

/// Classifier plus its held-out accuracy
#[derive(Debug, Clone)]
pub struct TrainedClassifier {
    pub model: RandomForestClassifier,
    pub accuracy: f64,
    pub train_rows: usize,
    pub test_rows: usize,
}

#[derive(Debug, Clone)]
pub struct Trainer {
    seed: u64,
    test_fraction: f64,
    forest: ForestParams,
    isolation: IsolationParams,
}

impl Trainer {
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            seed: config.random_seed,
            test_fraction: config.test_fraction,
            forest: ForestParams {
                n_estimators: config.estimator_count,
                seed: config.random_seed,
            },
            isolation: IsolationParams {
                n_estimators: config.outlier_estimator_count,
                contamination: config.contamination_rate,
                seed: config.random_seed,
            },
        }
    }

    /// Shuffle-split (seeded) into train / test index sets
    pub fn split(&self, n_rows: usize) -> MlResult<(Vec<usize>, Vec<usize>)> {
        if n_rows < 2 {
            return Err(MlError::DataUnavailable(format!(
                "need at least 2 rows to split, dataset has {}",
                n_rows
            )));
        }

        let test_rows = ((n_rows as f64 * self.test_fraction).ceil() as usize).clamp(1, n_rows - 1);

        let mut indices: Vec<usize> = (0..n_rows).collect();
        indices.shuffle(&mut StdRng::seed_from_u64(self.seed));
        let train = indices.split_off(test_rows);
        Ok((train, indices))
    }

    pub fn train_classifier(&self, dataset: &LabeledDataset) -> MlResult<TrainedClassifier> {
        let (train_idx, test_idx) = self.split(dataset.len())?;
        let train = dataset.select(&train_idx);
        let test = dataset.select(&test_idx);

        let model = RandomForestClassifier::fit(&train, &self.forest)?;
        let accuracy = model.accuracy(&test);

        tracing::info!(
            "Classifier trained: {} trees, {} train / {} test rows, accuracy {:.3}",
            model.n_estimators(),
            train.len(),
            test.len(),
            accuracy
        );

        Ok(TrainedClassifier {
            model,
            accuracy,
            train_rows: train.len(),
            test_rows: test.len(),
        })
    }

    /// Fit on every row, labels ignored
    pub fn train_outlier_detector(&self, dataset: &LabeledDataset) -> MlResult<IsolationForest> {
        let model = IsolationForest::fit(dataset.features(), &self.isolation)?;

        tracing::info!(
            "Outlier detector trained: {} trees over {} rows, contamination {}",
            model.n_estimators(),
            dataset.len(),
            model.contamination()
        );

        Ok(model)
    }

    pub fn forest_params(&self) -> &ForestParams {
        &self.forest
    }

    pub fn isolation_params(&self) -> &IsolationParams {
        &self.isolation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> LabeledDataset {
        let rows = (0..40)
            .map(|i| {
                let x = i as f64;
                ([x * 200.0, x * 8.0, (i % 5) as f64, x * 0.3], i >= 20)
            })
            .collect();
        LabeledDataset::from_rows(rows).unwrap()
    }

    fn trainer() -> Trainer {
        Trainer::new(&ModelConfig {
            estimator_count: 20,
            outlier_estimator_count: 20,
            ..ModelConfig::default()
        })
    }

    #[test]
    fn test_split_is_80_20_and_disjoint() {
        let (train, test) = trainer().split(40).unwrap();
        assert_eq!(test.len(), 8);
        assert_eq!(train.len(), 32);

        let mut all: Vec<usize> = train.iter().chain(test.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..40).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_rounds_test_size_up() {
        let (train, test) = trainer().split(11).unwrap();
        assert_eq!(test.len(), 3);
        assert_eq!(train.len(), 8);
    }

    #[test]
    fn test_split_needs_two_rows() {
        assert!(matches!(trainer().split(1), Err(MlError::DataUnavailable(_))));
    }

    #[test]
    fn test_training_is_deterministic() {
        let data = dataset();
        let a = trainer().train_classifier(&data).unwrap();
        let b = trainer().train_classifier(&data).unwrap();

        assert_eq!(a.accuracy, b.accuracy);
        assert_eq!(a.model, b.model);
        assert!((0.0..=1.0).contains(&a.accuracy));
    }

    #[test]
    fn test_different_seed_changes_split() {
        let other = Trainer::new(&ModelConfig {
            random_seed: 7,
            ..ModelConfig::default()
        });
        assert_ne!(trainer().split(40).unwrap().1, other.split(40).unwrap().1);
    }
}
