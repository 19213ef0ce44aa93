//! Batch inference: one decoded upload in, ordered predictions out.
//!
//! Stages run in a fixed order: prepare, align, scale, classify, explain,
//! evaluate, assemble. The validation gate sits between alignment and
//! scaling, so a rejected upload never costs a classifier call.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::common::config::{AppCfg, ExplainCfg};
use crate::common::error::{PloidyError, PloidyResult};
use crate::data::domain::Table;
use crate::data::encode::Precursors;
use crate::data::normalize::ColumnVocabulary;
use crate::data::service::{prepare, GroundTruth, PreparedBatch};
use crate::evaluation::service::evaluate;
use crate::explain::domain::Explainer;
use crate::explain::lime::LimeTabular;
use crate::explain::service::score_rows;
use crate::model::domain::label_for;
use crate::model::service::ModelStore;

use super::align::align;
use super::domain::{BatchOutcome, PloidyStatus, PredictionRecord};
use super::workers::Pool;

/// Everything needed to score uploads against one loaded model.
///
/// Holds only shared read-only state; one instance serves concurrent requests.
#[derive(Debug)]
pub struct Pipeline {
    store: Arc<ModelStore>,
    vocabulary: ColumnVocabulary,
    precursors: Precursors,
    explain: ExplainCfg,
    pool: Arc<Pool>,
}

impl Pipeline {
    pub fn new(store: Arc<ModelStore>, cfg: &AppCfg, pool: Arc<Pool>) -> Self {
        let vocabulary =
            ColumnVocabulary::new(store.schema().iter()).with_aliases(&cfg.column_aliases);
        let precursors = Precursors::for_features(store.schema().iter());
        Self {
            store,
            vocabulary,
            precursors,
            explain: cfg.explain.clone(),
            pool,
        }
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    /// Score one upload. Any validation issue rejects the whole batch.
    pub fn run(&self, raw: &Table) -> PloidyResult<BatchOutcome> {
        let started = Instant::now();
        let schema = self.store.schema();

        let PreparedBatch {
            ids,
            features,
            truth,
            mut issues,
        } = prepare(raw, &self.vocabulary, &self.precursors);

        let aligned = align(&features, schema).map_err(|found| issues.extend(found));
        issues
            .into_result()
            .inspect_err(|err| warn!("upload rejected: {err}"))?;
        let x = aligned.map_err(|()| PloidyError::internal("alignment failed without issues"))?;

        let scaled = self.store.scaler().transform(x.view())?;
        let classifier = self.store.classifier();
        let probabilities = classifier.predict_proba(scaled.view()).to_vec();
        let labels: Vec<u8> = probabilities.iter().map(|&p| label_for(p)).collect();

        let explainer = if self.explain.enabled {
            match LimeTabular::fit(scaled.view(), schema.names(), &self.explain) {
                Ok(explainer) => Some(explainer),
                Err(err) => {
                    warn!(error = %err, "explainer unavailable for this batch, using raw probabilities");
                    None
                }
            }
        } else {
            None
        };
        let scores = score_rows(
            &self.pool,
            scaled.view(),
            &probabilities,
            explainer.as_ref().map(|e| e as &dyn Explainer),
            classifier,
        );
        let explanation_fallbacks = if explainer.is_some() {
            scores.iter().filter(|s| s.explanation.is_none()).count()
        } else {
            0
        };

        let evaluation = match truth {
            GroundTruth::Absent => None,
            GroundTruth::Incomplete { unresolved } => {
                warn!(rows = ?unresolved, "label column has unmapped values, skipping evaluation");
                None
            }
            GroundTruth::Complete(y_true) => {
                let summary = evaluate(&y_true, &labels, &probabilities);
                info!(
                    samples = summary.samples,
                    accuracy = summary.accuracy,
                    auc = ?summary.auc,
                    recall_euploide = summary.recall_euploide,
                    recall_aneuploide = summary.recall_aneuploide,
                    "evaluation summary"
                );
                info!("confusion matrix\n{}", summary.confusion);
                info!("classification report\n{}", summary.report);
                Some(summary)
            }
        };

        let include = self.explain.include_in_response;
        let predictions: Vec<PredictionRecord> = ids
            .into_iter()
            .zip(labels)
            .zip(scores)
            .map(|((embryo_id, class), score)| PredictionRecord {
                embryo_id,
                ploidy_status: PloidyStatus::from_class(class),
                confidence_score: score.confidence,
                explanation: score.explanation.filter(|_| include),
            })
            .collect();

        info!(
            rows = predictions.len(),
            features = schema.len(),
            explanation_fallbacks,
            duration_ms = started.elapsed().as_millis() as u64,
            "batch scored"
        );
        Ok(BatchOutcome {
            predictions,
            evaluation,
            explanation_fallbacks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::domain::{Cell, Column, EmbryoId};
    use crate::model::domain::{LogisticClassifier, ScalerArtifact, StandardScaler};

    fn pipeline(explain: bool) -> Pipeline {
        pipeline_for(&["Estágio", "Morfo", "t2"], explain)
    }

    fn pipeline_for(features: &[&str], explain: bool) -> Pipeline {
        let scaler = StandardScaler::try_from(ScalerArtifact {
            feature_names: features.iter().map(|f| f.to_string()).collect(),
            mean: vec![4.0, 2.0, 25.0],
            scale: vec![1.0, 1.0, 5.0],
        })
        .unwrap();
        let classifier = LogisticClassifier::new(vec![0.5, -1.0, 0.2], 0.1).unwrap();
        let store = ModelStore::new(scaler, Box::new(classifier)).unwrap();
        let mut cfg = AppCfg::default();
        cfg.explain.enabled = explain;
        cfg.explain.num_samples = 200;
        Pipeline::new(Arc::new(store), &cfg, Arc::new(Pool::new(2).unwrap()))
    }

    fn upload() -> Table {
        Table::new(vec![
            Column::new("ID", vec![Cell::Text("E1".into()), Cell::Text("E2".into())]),
            Column::new("estagio", vec![Cell::Text("3D".into()), Cell::Text("5d".into())]),
            Column::new("MORFO", vec![Cell::Text("3AA".into()), Cell::Text("4CC".into())]),
            Column::new("t2", vec![Cell::Number(24.0), Cell::Number(31.0)]),
        ])
    }

    #[test]
    fn scores_every_row_in_order() {
        let outcome = pipeline(true).run(&upload()).unwrap();
        let ids: Vec<_> = outcome.predictions.iter().map(|p| p.embryo_id.clone()).collect();
        assert_eq!(ids, vec![EmbryoId::Text("E1".into()), EmbryoId::Text("E2".into())]);
        assert!(outcome
            .predictions
            .iter()
            .all(|p| (0.0..=100.0).contains(&p.confidence_score) && p.explanation.is_none()));
        assert!(outcome.evaluation.is_none());
    }

    #[test]
    fn explanations_do_not_change_confidence() {
        let with = pipeline(true).run(&upload()).unwrap();
        let without = pipeline(false).run(&upload()).unwrap();
        assert_eq!(with.predictions, without.predictions);
    }

    #[test]
    fn blank_precursor_is_reported_once() {
        let raw = Table::new(vec![
            Column::new("Estágio", vec![Cell::Empty]),
            Column::new("Morfo", vec![Cell::Text("3AA".into())]),
            Column::new("t2", vec![Cell::Number(24.0)]),
        ]);
        let Err(PloidyError::Validation(report)) = pipeline(false).run(&raw) else {
            panic!("expected a validation error");
        };
        assert_eq!(report.len(), 1);
        assert_eq!(report.issues()[0].column, "Estágio");
    }

    #[test]
    fn unaccented_trained_names_still_validate_precursors() {
        let raw = Table::new(vec![
            Column::new("Estágio", vec![Cell::Text("garbage".into())]),
            Column::new("Morfo", vec![Cell::Text("3AA".into())]),
            Column::new("t2", vec![Cell::Number(24.0)]),
        ]);
        let Err(PloidyError::Validation(report)) =
            pipeline_for(&["Estagio", "Morfo", "t2"], false).run(&raw)
        else {
            panic!("expected a validation error");
        };
        assert_eq!(report.len(), 1);
        assert_eq!(report.issues()[0].column, "Estagio");
        assert_eq!(report.issues()[0].row, Some(1));
    }

    #[test]
    fn trained_spelling_scores_like_the_canonical_one() {
        let canonical = pipeline(false).run(&upload()).unwrap();
        let respelled = pipeline_for(&["ESTAGIO", "morfo", "t2"], false)
            .run(&upload())
            .unwrap();
        assert_eq!(canonical.predictions, respelled.predictions);
    }
}
