//! Metric structures for labelled uploads.

use std::fmt;

use serde::Serialize;

/// Binary confusion counts; class 1 is Euploide.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct ConfusionCounts {
    pub tn: usize,
    pub fp: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
    pub tp: usize,
}

impl ConfusionCounts {
    pub fn from_labels(y_true: &[u8], y_pred: &[u8]) -> Self {
        let mut cm = Self::default();
        for (&t, &p) in y_true.iter().zip(y_pred) {
            match (t, p) {
                (1, 1) => cm.tp += 1,
                (1, _) => cm.fn_ += 1,
                (_, 1) => cm.fp += 1,
                _ => cm.tn += 1,
            }
        }
        cm
    }

    pub fn total(&self) -> usize {
        self.tn + self.fp + self.fn_ + self.tp
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.tp + self.tn, self.total())
    }

    /// True-positive rate of the Euploide class (sensitivity).
    pub fn recall_positive(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    /// True-negative rate, i.e. recall of the Aneuploide class (specificity).
    pub fn recall_negative(&self) -> f64 {
        ratio(self.tn, self.tn + self.fp)
    }

    pub fn precision_positive(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    pub fn precision_negative(&self) -> f64 {
        ratio(self.tn, self.tn + self.fn_)
    }
}

impl fmt::Display for ConfusionCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>16} {:>10} {:>10}", "", "Pred 0", "Pred 1")?;
        writeln!(f, "{:>16} {:>10} {:>10}", "Aneuploide (0)", self.tn, self.fp)?;
        write!(f, "{:>16} {:>10} {:>10}", "Euploide (1)", self.fn_, self.tp)
    }
}

/// `num / den`, or 0 when the denominator is 0.
pub fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Side report for uploads carrying ground truth.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationSummary {
    pub samples: usize,
    pub accuracy: f64,
    /// `None` when only one class is present.
    pub auc: Option<f64>,
    pub recall_euploide: f64,
    pub recall_aneuploide: f64,
    pub confusion: ConfusionCounts,
    pub report: String,
}
