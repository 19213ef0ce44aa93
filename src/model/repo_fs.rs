//! Filesystem repository for the trained artefacts.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::common::config::AppCfg;
use crate::common::error::{PloidyError, PloidyResult};

use super::domain::{ClassifierArtifact, ScalerArtifact};

/// Source of the two fitted artefacts.
pub trait ModelRepo {
    fn load_scaler(&self) -> PloidyResult<ScalerArtifact>;
    fn load_classifier(&self) -> PloidyResult<ClassifierArtifact>;
}

/// Reads JSON artefacts from the configured paths.
pub struct FsModelRepo {
    scaler_path: PathBuf,
    classifier_path: PathBuf,
}

impl FsModelRepo {
    pub fn new(cfg: &AppCfg) -> Self {
        Self::with_paths(cfg.scaler_path.clone(), cfg.classifier_path.clone())
    }

    pub fn with_paths(scaler_path: impl Into<PathBuf>, classifier_path: impl Into<PathBuf>) -> Self {
        Self {
            scaler_path: scaler_path.into(),
            classifier_path: classifier_path.into(),
        }
    }
}

impl ModelRepo for FsModelRepo {
    fn load_scaler(&self) -> PloidyResult<ScalerArtifact> {
        read_json(&self.scaler_path, "scaler")
    }

    fn load_classifier(&self) -> PloidyResult<ClassifierArtifact> {
        read_json(&self.classifier_path, "classifier")
    }
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> PloidyResult<T> {
    debug!(path = %path.display(), what, "reading artefact");
    let bytes = fs::read(path).map_err(|e| {
        PloidyError::model_missing(format!("cannot read {what} at {}: {e}", path.display()))
    })?;
    serde_json::from_slice(&bytes).map_err(|e| {
        PloidyError::model_missing(format!("cannot parse {what} at {}: {e}", path.display()))
    })
}
