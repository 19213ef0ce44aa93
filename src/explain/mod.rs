//! Explainability engine: local surrogate explanations and confidence scoring.

pub mod domain;
pub mod lime;
pub mod service;

pub use domain::{Explainer, Explanation, ExplanationError, FeatureWeight};
pub use lime::LimeTabular;
pub use service::{confidence_percent, score_rows, RowScore};
