//! Trained model store: fitted scaler, classifier and the feature schema they share.

pub mod domain;
pub mod repo_fs;
pub mod service;

pub use domain::{
    label_for, Activation, Classifier, ClassifierArtifact, FeatureSchema, LayerArtifact,
    LogisticClassifier, MlpClassifier, ScalerArtifact, StandardScaler,
};
pub use repo_fs::{FsModelRepo, ModelRepo};
pub use service::ModelStore;
