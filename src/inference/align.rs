//! Reconcile an upload's numeric columns with the trained feature list.

use ndarray::Array2;
use tracing::{debug, warn};

use crate::common::error::{ValidationIssue, ValidationReport};
use crate::data::domain::NumericFrame;
use crate::model::domain::FeatureSchema;

/// Build the `[rows, features]` matrix in trained order.
///
/// Trained features absent from `frame` become zero columns; columns outside
/// the schema are dropped. Empty cells in a present trained column are
/// reported, never zero-filled.
pub fn align(frame: &NumericFrame, schema: &FeatureSchema) -> Result<Array2<f64>, ValidationReport> {
    let extras: Vec<&str> = frame
        .names
        .iter()
        .map(String::as_str)
        .filter(|name| !schema.iter().any(|f| f == *name))
        .collect();
    if !extras.is_empty() {
        debug!(columns = ?extras, "dropping columns outside the trained schema");
    }

    let mut matrix = Array2::<f64>::zeros((frame.rows, schema.len()));
    let mut issues = ValidationReport::new();
    for (j, feature) in schema.iter().enumerate() {
        let Some(values) = frame.column(feature) else {
            warn!(feature, "trained feature missing from upload, filling with zeros");
            continue;
        };
        for (i, value) in values.iter().enumerate() {
            match value {
                Some(v) => matrix[[i, j]] = *v,
                None => issues.push(ValidationIssue::cell(i + 1, feature, "value is empty")),
            }
        }
    }

    if issues.is_empty() {
        Ok(matrix)
    } else {
        Err(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(names: &[&str]) -> FeatureSchema {
        FeatureSchema::new(names.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    fn frame(columns: &[(&str, Vec<Option<f64>>)]) -> NumericFrame {
        NumericFrame {
            names: columns.iter().map(|(n, _)| n.to_string()).collect(),
            rows: columns.first().map_or(0, |(_, v)| v.len()),
            values: columns.iter().map(|(_, v)| v.clone()).collect(),
        }
    }

    #[test]
    fn reorders_to_trained_order() {
        let input = frame(&[("b", vec![Some(2.0)]), ("a", vec![Some(1.0)])]);
        let x = align(&input, &schema(&["a", "b"])).unwrap();
        assert_eq!(x.row(0).to_vec(), vec![1.0, 2.0]);
    }

    #[test]
    fn missing_features_are_zero_and_extras_dropped() {
        let input = frame(&[("a", vec![Some(1.0), Some(3.0)]), ("extra", vec![Some(9.0), Some(9.0)])]);
        let x = align(&input, &schema(&["a", "b"])).unwrap();
        assert_eq!(x.shape(), &[2, 2]);
        assert_eq!(x.column(1).to_vec(), vec![0.0, 0.0]);
    }

    #[test]
    fn residual_blanks_are_reported() {
        let input = frame(&[("a", vec![Some(1.0), None])]);
        let report = align(&input, &schema(&["a"])).unwrap_err();
        assert_eq!(report.len(), 1);
        assert_eq!(report.issues()[0].row, Some(2));
        assert_eq!(report.issues()[0].column, "a");
    }
}
