//! Loads the trained artefacts once and exposes them read-only.

use std::sync::{Arc, OnceLock};

use tracing::info;

use crate::common::error::{PloidyError, PloidyResult};

use super::domain::{Classifier, FeatureSchema, StandardScaler};
use super::repo_fs::ModelRepo;

static STORE: OnceLock<Arc<ModelStore>> = OnceLock::new();

/// Immutable bundle of schema, scaler and classifier shared by all requests.
pub struct ModelStore {
    scaler: StandardScaler,
    classifier: Box<dyn Classifier>,
}

impl std::fmt::Debug for ModelStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelStore")
            .field("features", &self.scaler.schema().names())
            .field("classifier_inputs", &self.classifier.n_features())
            .finish()
    }
}

impl ModelStore {
    /// Pair a scaler with a classifier, rejecting incompatible shapes.
    pub fn new(scaler: StandardScaler, classifier: Box<dyn Classifier>) -> PloidyResult<Self> {
        if classifier.n_features() != scaler.schema().len() {
            return Err(PloidyError::model_missing(format!(
                "classifier expects {} features but the scaler was fitted on {}",
                classifier.n_features(),
                scaler.schema().len()
            )));
        }
        Ok(Self { scaler, classifier })
    }

    /// Read and check both artefacts from a repository.
    pub fn load(repo: &dyn ModelRepo) -> PloidyResult<Self> {
        let scaler = StandardScaler::try_from(repo.load_scaler()?)?;
        let artifact = repo.load_classifier()?;
        if let Some(names) = artifact.feature_names() {
            if names != scaler.schema().names() {
                return Err(PloidyError::model_missing(
                    "classifier feature names differ from the scaler's",
                ));
            }
        }
        let store = Self::new(scaler, artifact.into_classifier()?)?;
        info!(features = store.schema().len(), "trained artefacts loaded");
        Ok(store)
    }

    pub fn schema(&self) -> &FeatureSchema {
        self.scaler.schema()
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }
}

/// Install the process-wide store. Fails if one is already installed.
pub fn install(store: Arc<ModelStore>) -> PloidyResult<()> {
    STORE
        .set(store)
        .map_err(|_| PloidyError::internal("model store already installed"))
}

/// Read-only accessor for the process-wide store.
pub fn store() -> PloidyResult<Arc<ModelStore>> {
    STORE
        .get()
        .cloned()
        .ok_or_else(|| PloidyError::model_missing("model store not installed"))
}
