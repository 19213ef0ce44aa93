//! Domain definitions for batch predictions.

use serde::Serialize;

use crate::data::domain::EmbryoId;
use crate::evaluation::domain::EvaluationSummary;
use crate::explain::domain::Explanation;

/// Human-readable class of a prediction.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub enum PloidyStatus {
    Euploide,
    Aneuploide,
}

impl PloidyStatus {
    /// Class 1 is Euploide; anything else is Aneuploide.
    pub fn from_class(class: u8) -> Self {
        if class == 1 {
            PloidyStatus::Euploide
        } else {
            PloidyStatus::Aneuploide
        }
    }
}

/// One entry of the response payload.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRecord {
    pub embryo_id: EmbryoId,
    pub ploidy_status: PloidyStatus,
    /// Class-1 probability as a percentage in [0, 100].
    pub confidence_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<Explanation>,
}

impl PredictionRecord {
    pub fn class_predicted(&self) -> u8 {
        u8::from(self.ploidy_status == PloidyStatus::Euploide)
    }
}

/// Everything one upload produced.
#[derive(Clone, Debug)]
pub struct BatchOutcome {
    /// In upload row order.
    pub predictions: Vec<PredictionRecord>,
    pub evaluation: Option<EvaluationSummary>,
    /// Rows whose explanation failed and fell back to the raw probability.
    pub explanation_fallbacks: usize,
}
