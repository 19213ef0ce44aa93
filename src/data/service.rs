//! Service layer turning a raw upload table into model-ready numeric columns.

use tracing::debug;

use crate::common::error::ValidationReport;

use super::domain::{Cell, EmbryoId, NumericFrame, Table};
use super::encode::{encode, project_numeric, Precursors};
use super::normalize::{normalize, ColumnVocabulary, ID_COLUMN, LABEL_COLUMN};

/// Ground-truth state of an upload.
#[derive(Clone, Debug, PartialEq)]
pub enum GroundTruth {
    /// No label column.
    Absent,
    /// Label column present but some rows did not resolve to 0/1 (1-based rows).
    Incomplete { unresolved: Vec<usize> },
    /// Every row carries a binary label.
    Complete(Vec<u8>),
}

/// Upload after normalization and encoding, ready for alignment.
#[derive(Clone, Debug)]
pub struct PreparedBatch {
    pub ids: Vec<EmbryoId>,
    pub features: NumericFrame,
    pub truth: GroundTruth,
    /// Precursor failures; the batch must not reach the classifier unless empty.
    pub issues: ValidationReport,
}

/// Normalize, encode and project one upload.
pub fn prepare(raw: &Table, vocabulary: &ColumnVocabulary, required: &Precursors) -> PreparedBatch {
    let canonical = normalize(raw, vocabulary);
    let encoded = encode(canonical, required);
    let table = encoded.table;

    let ids = extract_ids(&table);
    let truth = extract_truth(&table);
    let features = project_numeric(&table, &[ID_COLUMN, LABEL_COLUMN]);
    debug!(
        rows = table.n_rows(),
        numeric_columns = features.names.len(),
        issues = encoded.issues.len(),
        "upload prepared"
    );

    PreparedBatch {
        ids,
        features,
        truth,
        issues: encoded.issues,
    }
}

fn extract_ids(table: &Table) -> Vec<EmbryoId> {
    let positions = (1..=table.n_rows()).map(EmbryoId::Position);
    let Some(column) = table.column(ID_COLUMN) else {
        return positions.collect();
    };
    column
        .cells
        .iter()
        .zip(positions)
        .map(|(cell, position)| match cell {
            Cell::Empty => position,
            Cell::Number(v) if v.fract() == 0.0 && v.abs() < 1e15 => EmbryoId::Number(*v as i64),
            other => EmbryoId::Text(other.to_string()),
        })
        .collect()
}

fn extract_truth(table: &Table) -> GroundTruth {
    let Some(column) = table.column(LABEL_COLUMN) else {
        return GroundTruth::Absent;
    };
    let mut labels = Vec::with_capacity(column.cells.len());
    let mut unresolved = Vec::new();
    for (idx, cell) in column.cells.iter().enumerate() {
        match cell.as_number() {
            Some(v) if v == 0.0 || v == 1.0 => labels.push(v as u8),
            _ => unresolved.push(idx + 1),
        }
    }
    if unresolved.is_empty() {
        GroundTruth::Complete(labels)
    } else {
        GroundTruth::Incomplete { unresolved }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::domain::Column;
    use crate::data::normalize::{MORPHOLOGY_COLUMN, STAGE_COLUMN};

    fn vocab() -> ColumnVocabulary {
        ColumnVocabulary::new([STAGE_COLUMN, MORPHOLOGY_COLUMN, "t2"])
    }

    fn required() -> Precursors {
        Precursors::required()
    }

    #[test]
    fn ids_fall_back_to_row_position() {
        let raw = Table::new(vec![
            Column::new("Estagio", vec![Cell::Text("3D".into()); 3]),
            Column::new("Morfo", vec![Cell::Text("3AA".into()); 3]),
        ]);
        let batch = prepare(&raw, &vocab(), &required());
        assert_eq!(
            batch.ids,
            vec![EmbryoId::Position(1), EmbryoId::Position(2), EmbryoId::Position(3)]
        );
        assert_eq!(batch.truth, GroundTruth::Absent);
        assert!(batch.issues.is_empty());
    }

    #[test]
    fn uploaded_ids_are_preserved() {
        let raw = Table::new(vec![
            Column::new(
                "Embryo_ID",
                vec![Cell::Text("E1".into()), Cell::Number(12.0), Cell::Empty],
            ),
            Column::new("Estágio", vec![Cell::Number(5.0); 3]),
            Column::new("Morfo", vec![Cell::Text("4AB".into()); 3]),
        ]);
        let batch = prepare(&raw, &vocab(), &required());
        assert_eq!(
            batch.ids,
            vec![
                EmbryoId::Text("E1".into()),
                EmbryoId::Number(12),
                EmbryoId::Position(3)
            ]
        );
        assert!(batch.features.column(ID_COLUMN).is_none());
    }

    #[test]
    fn accented_labels_resolve() {
        let raw = Table::new(vec![
            Column::new("Estágio", vec![Cell::Number(5.0); 2]),
            Column::new("Morfo", vec![Cell::Text("4AB".into()); 2]),
            Column::new(
                "Ploidia",
                vec![Cell::Text("Euplóide".into()), Cell::Text("ANEUPLÓIDE".into())],
            ),
        ]);
        let batch = prepare(&raw, &vocab(), &required());
        assert_eq!(batch.truth, GroundTruth::Complete(vec![1, 0]));
        assert!(batch.features.column(LABEL_COLUMN).is_none());
    }

    #[test]
    fn unmapped_labels_mark_truth_incomplete() {
        let raw = Table::new(vec![
            Column::new("Estágio", vec![Cell::Number(5.0); 2]),
            Column::new("Morfo", vec![Cell::Text("4AB".into()); 2]),
            Column::new("Ploidia", vec![Cell::Text("Mosaico".into()), Cell::Number(1.0)]),
        ]);
        let batch = prepare(&raw, &vocab(), &required());
        assert_eq!(batch.truth, GroundTruth::Incomplete { unresolved: vec![1] });
    }
}
