//! Metric computation for uploads that carry ground-truth labels.

use super::domain::{ratio, ConfusionCounts, EvaluationSummary};

/// Compute the summary. Slices must have equal length.
pub fn evaluate(y_true: &[u8], y_pred: &[u8], probabilities: &[f64]) -> EvaluationSummary {
    debug_assert_eq!(y_true.len(), y_pred.len());
    debug_assert_eq!(y_true.len(), probabilities.len());

    let confusion = ConfusionCounts::from_labels(y_true, y_pred);
    EvaluationSummary {
        samples: confusion.total(),
        accuracy: confusion.accuracy(),
        auc: roc_auc(y_true, probabilities),
        recall_euploide: confusion.recall_positive(),
        recall_aneuploide: confusion.recall_negative(),
        confusion,
        report: classification_report(&confusion),
    }
}

/// Area under the ROC curve via the rank-sum statistic; ties share their average rank.
///
/// Returns `None` unless both classes are present.
pub fn roc_auc(y_true: &[u8], scores: &[f64]) -> Option<f64> {
    let n_pos = y_true.iter().filter(|&&y| y == 1).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut rank_sum_pos = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        // ranks are 1-based; the tie group spans ranks i+1..=j+1
        let avg_rank = (i + j + 2) as f64 / 2.0;
        rank_sum_pos += order[i..=j]
            .iter()
            .filter(|&&k| y_true[k] == 1)
            .count() as f64
            * avg_rank;
        i = j + 1;
    }

    let n_pos = n_pos as f64;
    let u = rank_sum_pos - n_pos * (n_pos + 1.0) / 2.0;
    Some(u / (n_pos * n_neg as f64))
}

/// Per-class precision/recall/f1/support table with averages.
pub fn classification_report(cm: &ConfusionCounts) -> String {
    let rows = [
        (
            "Aneuploide (0)",
            cm.precision_negative(),
            cm.recall_negative(),
            cm.tn + cm.fp,
        ),
        (
            "Euploide (1)",
            cm.precision_positive(),
            cm.recall_positive(),
            cm.tp + cm.fn_,
        ),
    ];
    let total = cm.total();

    let mut report = format!(
        "{:>16} {:>10} {:>10} {:>10} {:>10}\n",
        "", "precision", "recall", "f1-score", "support"
    );
    report.push_str(&"-".repeat(60));
    report.push('\n');

    let mut macro_avg = [0.0; 3];
    let mut weighted_avg = [0.0; 3];
    for (name, precision, recall, support) in rows {
        let f1_score = f1(precision, recall);
        report.push_str(&format!(
            "{name:>16} {precision:>10.2} {recall:>10.2} {f1_score:>10.2} {support:>10}\n"
        ));
        let weight = ratio(support, total);
        for (slot, value) in [precision, recall, f1_score].into_iter().enumerate() {
            macro_avg[slot] += value / rows.len() as f64;
            weighted_avg[slot] += value * weight;
        }
    }

    report.push_str(&"-".repeat(60));
    report.push('\n');
    report.push_str(&format!(
        "{:>16} {:>10} {:>10} {:>10.2} {:>10}\n",
        "accuracy", "", "", cm.accuracy(), total
    ));
    for (name, avg) in [("macro avg", macro_avg), ("weighted avg", weighted_avg)] {
        report.push_str(&format!(
            "{name:>16} {:>10.2} {:>10.2} {:>10.2} {total:>10}\n",
            avg[0], avg[1], avg[2]
        ));
    }
    report
}

fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    }
}
