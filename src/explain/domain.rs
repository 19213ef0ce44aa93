//! Domain types for per-row local explanations.

use ndarray::ArrayView1;
use serde::Serialize;
use thiserror::Error;

use crate::model::domain::Classifier;

/// Contribution of one feature condition to the local surrogate.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FeatureWeight {
    pub feature: String,
    /// Bin condition the row falls into, e.g. `Morfo <= -0.12`.
    pub condition: String,
    pub weight: f64,
}

/// Local surrogate fitted around one row.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Explanation {
    pub intercept: f64,
    /// Surrogate prediction at the row itself.
    pub local_prediction: f64,
    /// Weighted R² of the surrogate on the perturbed samples.
    pub score: f64,
    /// Sorted by descending absolute weight.
    pub weights: Vec<FeatureWeight>,
}

/// Why a single row could not be explained. Never fails a request.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ExplanationError {
    #[error("background distribution is empty")]
    EmptyBackground,
    #[error("row has {got} features, explainer was fitted on {expected}")]
    WidthMismatch { expected: usize, got: usize },
    #[error("classifier returned non-finite probabilities on perturbed samples")]
    NonFinitePredictions,
    #[error("surrogate system is singular")]
    Singular,
    #[error("surrogate produced non-finite coefficients")]
    NonFiniteCoefficients,
}

/// Builds a local explanation for one scaled row.
pub trait Explainer: Send + Sync {
    /// `row` is the 0-based batch position; implementations use it to keep
    /// sampling independent of scheduling order.
    fn explain(
        &self,
        row: usize,
        instance: ArrayView1<'_, f64>,
        model: &dyn Classifier,
    ) -> Result<Explanation, ExplanationError>;
}
