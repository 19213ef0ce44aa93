//! Confidence scoring with optional per-row explanations.
//!
//! The confidence figure is always the classifier's class-1 probability; an
//! explanation never changes it. Without an explainer, or when one row
//! cannot be explained, that row simply carries no explanation.

use ndarray::ArrayView2;
use tracing::warn;

use crate::inference::workers::Pool;
use crate::model::domain::Classifier;

use super::domain::{Explainer, Explanation};

/// Confidence figure and optional explanation for one row.
#[derive(Clone, Debug, PartialEq)]
pub struct RowScore {
    /// Percentage in [0, 100], two decimals.
    pub confidence: f64,
    pub explanation: Option<Explanation>,
}

/// Class-1 probability as a percentage rounded to two decimals.
pub fn confidence_percent(probability: f64) -> f64 {
    let pct = (probability * 100.0 * 100.0).round_ties_even() / 100.0;
    pct.clamp(0.0, 100.0)
}

/// Score every row, explaining each independently on the pool.
pub fn score_rows(
    pool: &Pool,
    scaled: ArrayView2<'_, f64>,
    probabilities: &[f64],
    explainer: Option<&dyn Explainer>,
    model: &dyn Classifier,
) -> Vec<RowScore> {
    debug_assert_eq!(scaled.nrows(), probabilities.len());
    let Some(explainer) = explainer else {
        return probabilities
            .iter()
            .map(|&p| RowScore {
                confidence: confidence_percent(p),
                explanation: None,
            })
            .collect();
    };

    pool.map_rows(probabilities.len(), |row| {
        let explanation = match explainer.explain(row, scaled.row(row), model) {
            Ok(explanation) => Some(explanation),
            Err(err) => {
                warn!(row = row + 1, error = %err, "explanation failed, using raw probability");
                None
            }
        };
        RowScore {
            confidence: confidence_percent(probabilities[row]),
            explanation,
        }
    })
}
