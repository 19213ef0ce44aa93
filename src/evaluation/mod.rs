//! Evaluation of predictions against ground truth, when the upload carries it.

pub mod domain;
pub mod service;

pub use domain::{ConfusionCounts, EvaluationSummary};
pub use service::{classification_report, evaluate, roc_auc};
