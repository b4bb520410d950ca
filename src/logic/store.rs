//! Model Store - persisted classifier and outlier detector
//!
//! Each model lives in one JSON artifact at a configured path. A read that
//! finds no artifact trains, persists and returns one; the whole
//! check-train-persist sequence runs under a per-artifact lock so a model is
//! trained at most once even when first requests arrive together.
//!
//! Loaded artifacts are cached in memory, keyed by file modification time.
//! Deleting the file externally forces a retrain on the next read.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::ModelConfig;
use super::dataset::LabeledDataset;
use super::error::{MlError, MlResult};
use super::estimators::{IsolationForest, RandomForestClassifier};
use super::trainer::Trainer;

pub const CLASSIFIER_ALGORITHM: &str = "RandomForest";
pub const OUTLIER_ALGORITHM: &str = "IsolationForest";

// ============================================================================
// ARTIFACTS
// ============================================================================

/// On-disk envelope: training metadata plus the fitted model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact<M> {
    pub algorithm: String,
    pub trained_at: DateTime<Utc>,
    pub seed: u64,
    pub estimators: usize,
    pub training_rows: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contamination: Option<f64>,
    pub model: M,
}

pub type ClassifierArtifact = ModelArtifact<RandomForestClassifier>;
pub type OutlierArtifact = ModelArtifact<IsolationForest>;

/// Envelope metadata without the model body
#[derive(Debug, Deserialize)]
struct ArtifactHeader {
    algorithm: String,
    trained_at: DateTime<Utc>,
    accuracy: Option<f64>,
}

/// What is currently persisted for one model
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactStatus {
    pub path: String,
    pub present: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trained_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

fn modified_time(path: &Path) -> MlResult<Option<SystemTime>> {
    match fs::metadata(path) {
        Ok(meta) => Ok(Some(meta.modified()?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn read_artifact<M: DeserializeOwned>(path: &Path) -> MlResult<ModelArtifact<M>> {
    let data = fs::read(path)?;
    serde_json::from_slice(&data).map_err(|e| {
        MlError::DataUnavailable(format!("corrupt model artifact {}: {}", path.display(), e))
    })
}

/// Write through a temp file so readers never see a partial artifact
fn write_artifact<M: Serialize>(path: &Path, artifact: &ModelArtifact<M>) -> MlResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_vec(artifact)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn artifact_status(path: &Path) -> MlResult<ArtifactStatus> {
    let mut status = ArtifactStatus {
        path: path.display().to_string(),
        present: false,
        algorithm: None,
        trained_at: None,
        accuracy: None,
        sha256: None,
    };

    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(status),
        Err(e) => return Err(e.into()),
    };

    let header: ArtifactHeader = serde_json::from_slice(&data)?;
    status.present = true;
    status.algorithm = Some(header.algorithm);
    status.trained_at = Some(header.trained_at);
    status.accuracy = header.accuracy;
    status.sha256 = Some(hex::encode(Sha256::digest(&data)));
    Ok(status)
}

// ============================================================================
// SLOT
// ============================================================================

struct Cached<M> {
    modified: SystemTime,
    artifact: Arc<ModelArtifact<M>>,
}

/// One artifact path guarded by its own lock
struct Slot<M> {
    path: PathBuf,
    cached: Mutex<Option<Cached<M>>>,
}

impl<M: Serialize + DeserializeOwned> Slot<M> {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            cached: Mutex::new(None),
        }
    }

    fn get_or_train<F>(&self, train: F) -> MlResult<Arc<ModelArtifact<M>>>
    where
        F: FnOnce() -> MlResult<ModelArtifact<M>>,
    {
        let mut cached = self.cached.lock();

        let Some(modified) = modified_time(&self.path)? else {
            tracing::info!("No model artifact at {}, training", self.path.display());
            let artifact = train()?;
            return self.persist(&mut cached, artifact);
        };

        if let Some(entry) = cached.as_ref() {
            if entry.modified == modified {
                tracing::debug!("Model cache hit for {}", self.path.display());
                return Ok(entry.artifact.clone());
            }
        }

        tracing::debug!("Loading model artifact from {}", self.path.display());
        let artifact = Arc::new(read_artifact(&self.path)?);
        *cached = Some(Cached {
            modified,
            artifact: artifact.clone(),
        });
        Ok(artifact)
    }

    /// Train unconditionally and replace whatever is persisted.
    /// `train` receives the previous artifact, if one could be read.
    fn retrain<F>(&self, train: F) -> MlResult<Arc<ModelArtifact<M>>>
    where
        F: FnOnce(Option<&ModelArtifact<M>>) -> MlResult<ModelArtifact<M>>,
    {
        let mut cached = self.cached.lock();

        let previous = match modified_time(&self.path)? {
            Some(modified) => match cached.as_ref() {
                Some(entry) if entry.modified == modified => Some(entry.artifact.clone()),
                _ => match read_artifact(&self.path) {
                    Ok(artifact) => Some(Arc::new(artifact)),
                    Err(e) => {
                        tracing::warn!(
                            "Replacing unreadable artifact {}: {}",
                            self.path.display(),
                            e
                        );
                        None
                    }
                },
            },
            None => None,
        };

        let artifact = train(previous.as_deref())?;
        self.persist(&mut cached, artifact)
    }

    fn persist(
        &self,
        cached: &mut Option<Cached<M>>,
        artifact: ModelArtifact<M>,
    ) -> MlResult<Arc<ModelArtifact<M>>> {
        write_artifact(&self.path, &artifact)?;
        let modified = modified_time(&self.path)?.ok_or_else(|| {
            MlError::DataUnavailable(format!(
                "artifact {} vanished after write",
                self.path.display()
            ))
        })?;

        tracing::info!("Model artifact saved to {}", self.path.display());

        let artifact = Arc::new(artifact);
        *cached = Some(Cached {
            modified,
            artifact: artifact.clone(),
        });
        Ok(artifact)
    }
}

// ============================================================================
// STORE
// ============================================================================

/// The dataset has a fixed shape, so a training rejection means the model
/// settings are unusable; that is a service fault, not a bad request.
fn training_failed(err: MlError) -> MlError {
    match err {
        MlError::Computation(msg) => {
            MlError::DataUnavailable(format!("model training failed: {}", msg))
        }
        other => other,
    }
}

pub struct ModelStore {
    dataset_path: PathBuf,
    trainer: Trainer,
    classifier: Slot<RandomForestClassifier>,
    outlier: Slot<IsolationForest>,
}

impl ModelStore {
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            dataset_path: config.dataset_path.clone(),
            trainer: Trainer::new(config),
            classifier: Slot::new(config.classifier_path.clone()),
            outlier: Slot::new(config.outlier_path.clone()),
        }
    }

    /// Persisted classifier, training it first if absent
    pub fn get_classifier(&self) -> MlResult<Arc<ClassifierArtifact>> {
        self.classifier.get_or_train(|| self.fit_classifier())
    }

    /// Persisted outlier detector, training it first if absent
    pub fn get_outlier_detector(&self) -> MlResult<Arc<OutlierArtifact>> {
        self.outlier.get_or_train(|| self.fit_outlier_detector())
    }

    /// Retrain from the dataset and overwrite the persisted classifier
    pub fn retrain_classifier(&self) -> MlResult<Arc<ClassifierArtifact>> {
        self.classifier.retrain(|previous| {
            let artifact = self.fit_classifier()?;
            if let (Some(old), Some(new)) = (previous.and_then(|p| p.accuracy), artifact.accuracy) {
                if new < old {
                    tracing::warn!(
                        "Retrained classifier accuracy dropped from {:.3} to {:.3}",
                        old,
                        new
                    );
                }
            }
            Ok(artifact)
        })
    }

    /// Retrain from the dataset and overwrite the persisted outlier detector
    pub fn retrain_outlier_detector(&self) -> MlResult<Arc<OutlierArtifact>> {
        self.outlier.retrain(|_| self.fit_outlier_detector())
    }

    pub fn classifier_status(&self) -> MlResult<ArtifactStatus> {
        artifact_status(&self.classifier.path)
    }

    pub fn outlier_status(&self) -> MlResult<ArtifactStatus> {
        artifact_status(&self.outlier.path)
    }

    fn fit_classifier(&self) -> MlResult<ClassifierArtifact> {
        let dataset = LabeledDataset::load(&self.dataset_path)?;
        let trained = self
            .trainer
            .train_classifier(&dataset)
            .map_err(training_failed)?;

        tracing::info!(
            "Classifier evaluated on {} held-out rows, saving to {}",
            trained.test_rows,
            self.classifier.path.display()
        );

        Ok(ModelArtifact {
            algorithm: CLASSIFIER_ALGORITHM.to_string(),
            trained_at: Utc::now(),
            seed: self.trainer.forest_params().seed,
            estimators: trained.model.n_estimators(),
            training_rows: trained.train_rows,
            accuracy: Some(trained.accuracy),
            contamination: None,
            model: trained.model,
        })
    }

    fn fit_outlier_detector(&self) -> MlResult<OutlierArtifact> {
        let dataset = LabeledDataset::load(&self.dataset_path)?;
        let model = self
            .trainer
            .train_outlier_detector(&dataset)
            .map_err(training_failed)?;

        Ok(ModelArtifact {
            algorithm: OUTLIER_ALGORITHM.to_string(),
            trained_at: Utc::now(),
            seed: self.trainer.isolation_params().seed,
            estimators: model.n_estimators(),
            training_rows: dataset.len(),
            accuracy: None,
            contamination: Some(model.contamination()),
            model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tempfile::TempDir;

    fn write_dataset(dir: &Path) -> PathBuf {
        let path = dir.join("assets.csv");
        let mut csv =
            String::from("usage_hours,last_maintenance_days,failures,age_years,will_fail_soon\n");
        for i in 0..40 {
            let x = i as f64;
            let label = u8::from(i >= 22);
            csv.push_str(&format!("{},{},{},{},{}\n", x * 220.0, x * 9.0, i % 5, x * 0.35, label));
        }
        fs::write(&path, csv).unwrap();
        path
    }

    fn setup() -> (TempDir, ModelConfig) {
        let dir = TempDir::new().unwrap();
        let config = ModelConfig {
            dataset_path: write_dataset(dir.path()),
            classifier_path: dir.path().join("models/classifier.json"),
            outlier_path: dir.path().join("models/outlier.json"),
            estimator_count: 10,
            outlier_estimator_count: 10,
            ..ModelConfig::default()
        };
        (dir, config)
    }

    #[test]
    fn test_first_read_trains_and_persists() {
        let (_dir, config) = setup();
        let store = ModelStore::new(&config);
        assert!(!config.classifier_path.exists());

        let artifact = store.get_classifier().unwrap();
        assert!(config.classifier_path.exists());
        assert_eq!(artifact.algorithm, CLASSIFIER_ALGORITHM);
        assert_eq!(artifact.estimators, 10);
        assert!(artifact.accuracy.is_some());
    }

    #[test]
    fn test_warm_read_does_not_retrain() {
        let (_dir, config) = setup();
        let store = ModelStore::new(&config);

        let first = store.get_classifier().unwrap();
        let before = fs::metadata(&config.classifier_path).unwrap().modified().unwrap();

        let second = store.get_classifier().unwrap();
        let after = fs::metadata(&config.classifier_path).unwrap().modified().unwrap();

        assert_eq!(before, after);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_fresh_store_reuses_persisted_artifact() {
        let (_dir, config) = setup();
        let trained_at = ModelStore::new(&config).get_outlier_detector().unwrap().trained_at;
        let before = fs::metadata(&config.outlier_path).unwrap().modified().unwrap();

        let reloaded = ModelStore::new(&config).get_outlier_detector().unwrap();
        let after = fs::metadata(&config.outlier_path).unwrap().modified().unwrap();

        assert_eq!(before, after);
        assert_eq!(reloaded.trained_at, trained_at);
    }

    #[test]
    fn test_deleted_artifact_is_retrained() {
        let (_dir, config) = setup();
        let store = ModelStore::new(&config);

        store.get_classifier().unwrap();
        fs::remove_file(&config.classifier_path).unwrap();

        store.get_classifier().unwrap();
        assert!(config.classifier_path.exists());
    }

    #[test]
    fn test_missing_dataset_propagates() {
        let (dir, mut config) = setup();
        config.dataset_path = dir.path().join("missing.csv");
        let store = ModelStore::new(&config);

        assert!(matches!(store.get_classifier(), Err(MlError::DataUnavailable(_))));
        assert!(matches!(store.get_outlier_detector(), Err(MlError::DataUnavailable(_))));
        assert!(!config.classifier_path.exists());
    }

    #[test]
    fn test_corrupt_artifact_is_data_unavailable() {
        let (_dir, config) = setup();
        fs::create_dir_all(config.classifier_path.parent().unwrap()).unwrap();
        fs::write(&config.classifier_path, b"not json").unwrap();

        let store = ModelStore::new(&config);
        assert!(matches!(store.get_classifier(), Err(MlError::DataUnavailable(_))));
    }

    #[test]
    fn test_retrain_replaces_cached_model() {
        let (_dir, config) = setup();
        let store = ModelStore::new(&config);

        let first = store.get_classifier().unwrap();
        let retrained = store.retrain_classifier().unwrap();
        assert!(!Arc::ptr_eq(&first, &retrained));
        assert_eq!(first.accuracy, retrained.accuracy);

        let current = store.get_classifier().unwrap();
        assert!(Arc::ptr_eq(&retrained, &current));
    }

    #[test]
    fn test_retrain_replaces_unreadable_artifact() {
        let (_dir, config) = setup();
        fs::create_dir_all(config.classifier_path.parent().unwrap()).unwrap();
        fs::write(&config.classifier_path, b"not json").unwrap();

        let store = ModelStore::new(&config);
        let retrained = store.retrain_classifier().unwrap();
        assert!(retrained.accuracy.is_some());

        let on_disk: ClassifierArtifact =
            serde_json::from_slice(&fs::read(&config.classifier_path).unwrap()).unwrap();
        assert_eq!(on_disk.trained_at, retrained.trained_at);
        assert_eq!(on_disk.training_rows, retrained.training_rows);
        assert!(Arc::ptr_eq(&store.get_classifier().unwrap(), &retrained));
    }

    #[test]
    fn test_untrainable_settings_are_data_unavailable() {
        let (_dir, mut config) = setup();
        config.contamination_rate = 0.7;
        config.estimator_count = 0;
        let store = ModelStore::new(&config);

        assert!(matches!(store.get_outlier_detector(), Err(MlError::DataUnavailable(_))));
        assert!(matches!(store.retrain_classifier(), Err(MlError::DataUnavailable(_))));
        assert!(!config.outlier_path.exists());
        assert!(!config.classifier_path.exists());
    }

    #[test]
    fn test_concurrent_first_reads_train_once() {
        let (_dir, config) = setup();
        let store = Arc::new(ModelStore::new(&config));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                thread::spawn(move || store.get_classifier().unwrap())
            })
            .collect();
        let artifacts: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(artifacts.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn test_status_reports_checksum() {
        let (_dir, config) = setup();
        let store = ModelStore::new(&config);

        let status = store.classifier_status().unwrap();
        assert!(!status.present);
        assert!(status.sha256.is_none());

        store.get_classifier().unwrap();
        let status = store.classifier_status().unwrap();
        assert!(status.present);
        assert_eq!(status.algorithm.as_deref(), Some(CLASSIFIER_ALGORITHM));
        assert_eq!(status.sha256.map(|s| s.len()), Some(64));
    }
}
