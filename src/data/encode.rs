//! Feature encoder: derives the engineered stage and morphology features.

use std::fmt;

use tracing::debug;

use crate::common::error::{ValidationIssue, ValidationReport};

use super::domain::{Cell, NumericFrame, Table};
use super::normalize::{fold, LABEL_COLUMN, MORPHOLOGY_COLUMN, STAGE_COLUMN};

/// Ordinal morphology grade; lower is better.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
#[repr(u8)]
pub enum MorphologyGrade {
    Excelente = 1,
    Bom = 2,
    Medio = 3,
    Ruim = 4,
}

impl MorphologyGrade {
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            MorphologyGrade::Excelente => "Excelente",
            MorphologyGrade::Bom => "Bom",
            MorphologyGrade::Medio => "Médio",
            MorphologyGrade::Ruim => "Ruim",
        }
    }
}

impl fmt::Display for MorphologyGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Grade a morphology code such as `4AB`.
///
/// Returns `None` only for a blank code; every non-blank code gets a grade,
/// with anything outside the known patterns landing on [`MorphologyGrade::Ruim`].
pub fn classify_morphology(code: &str) -> Option<MorphologyGrade> {
    let code = code.trim();
    let mut chars = code.chars();
    let prefix = chars.next()?;
    let suffix = chars.as_str().to_ascii_uppercase();
    let expanded = matches!(prefix, '3' | '4' | '5' | '6');

    let grade = match suffix.as_str() {
        "AA" if expanded => MorphologyGrade::Excelente,
        "AB" | "BA" if expanded => MorphologyGrade::Bom,
        "BB" | "AC" | "CA" if expanded => MorphologyGrade::Medio,
        _ => MorphologyGrade::Ruim,
    };
    Some(grade)
}

/// Remove every day-marker letter (`D`/`d`) from a stage value.
pub fn strip_stage_marker(text: &str) -> String {
    text.chars().filter(|c| !matches!(c, 'D' | 'd')).collect()
}

/// Numeric stage, or `None` when the value cannot be read as a number.
pub fn encode_stage(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(v) => Some(*v),
        Cell::Text(text) => strip_stage_marker(text)
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite()),
        Cell::Empty => None,
    }
}

/// Map a folded label to its binary class; unknown values stay as they are.
pub fn encode_label(cell: &Cell) -> Cell {
    match cell {
        Cell::Text(text) => match text.as_str() {
            "euploide" => Cell::Number(1.0),
            "aneuploide" => Cell::Number(0.0),
            _ => cell.clone(),
        },
        other => other.clone(),
    }
}

/// Where the engineered features live and whether the trained schema needs them.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Precursors {
    /// Stage header after normalization, in the trained spelling when trained.
    pub stage_column: String,
    pub morphology_column: String,
    pub stage: bool,
    pub morphology: bool,
}

impl Default for Precursors {
    fn default() -> Self {
        Self {
            stage_column: STAGE_COLUMN.to_string(),
            morphology_column: MORPHOLOGY_COLUMN.to_string(),
            stage: false,
            morphology: false,
        }
    }
}

impl Precursors {
    /// Both precursors required under their canonical names.
    pub fn required() -> Self {
        Self {
            stage: true,
            morphology: true,
            ..Self::default()
        }
    }

    /// Match trained names by folded key, so `Estagio` or `MORFO` still count.
    pub fn for_features<'a>(features: impl IntoIterator<Item = &'a str>) -> Self {
        let stage_key = fold(STAGE_COLUMN);
        let morphology_key = fold(MORPHOLOGY_COLUMN);
        let mut out = Self::default();
        for feature in features {
            let key = fold(feature);
            if key == stage_key {
                out.stage_column = feature.to_string();
                out.stage = true;
            } else if key == morphology_key {
                out.morphology_column = feature.to_string();
                out.morphology = true;
            }
        }
        out
    }
}

/// Output of [`encode`]: the encoded table and every precursor failure found.
#[derive(Clone, Debug)]
pub struct Encoded {
    pub table: Table,
    pub issues: ValidationReport,
}

/// Encode stage, morphology and label columns in place.
pub fn encode(mut table: Table, required: &Precursors) -> Encoded {
    let mut issues = ValidationReport::new();
    let stage_column = required.stage_column.as_str();
    let morphology_column = required.morphology_column.as_str();

    if required.stage && !table.has_column(stage_column) {
        issues.push(ValidationIssue::column(stage_column, "required column is missing"));
    }
    if required.morphology && !table.has_column(morphology_column) {
        issues.push(ValidationIssue::column(morphology_column, "required column is missing"));
    }

    if let Some(stage) = table.column_mut(stage_column) {
        for (idx, cell) in stage.cells.iter_mut().enumerate() {
            let encoded = encode_stage(cell);
            if encoded.is_none() && required.stage {
                issues.push(ValidationIssue::cell(
                    idx + 1,
                    stage_column,
                    format!("stage value '{cell}' is not a number"),
                ));
            }
            *cell = encoded.map_or(Cell::Empty, Cell::Number);
        }
    }

    if let Some(morphology) = table.column_mut(morphology_column) {
        for (idx, cell) in morphology.cells.iter_mut().enumerate() {
            let grade = cell.as_text().and_then(|code| classify_morphology(&code));
            if grade.is_none() && required.morphology {
                issues.push(ValidationIssue::cell(
                    idx + 1,
                    morphology_column,
                    "morphology code is empty",
                ));
            }
            *cell = grade.map_or(Cell::Empty, |g| Cell::Number(f64::from(g.ordinal())));
        }
    }

    if let Some(label) = table.column_mut(LABEL_COLUMN) {
        for cell in label.cells.iter_mut() {
            *cell = encode_label(cell);
        }
    }

    Encoded { table, issues }
}

/// Keep only numeric columns, skipping the `excluded` ones.
pub fn project_numeric(table: &Table, excluded: &[&str]) -> NumericFrame {
    let mut frame = NumericFrame {
        rows: table.n_rows(),
        ..NumericFrame::default()
    };
    for column in table.columns() {
        if excluded.contains(&column.name.as_str()) {
            continue;
        }
        if !column.is_numeric() {
            debug!(column = %column.name, "dropping non-numeric column");
            continue;
        }
        frame.names.push(column.name.clone());
        frame.values.push(column.cells.iter().map(Cell::as_number).collect());
    }
    frame
}
