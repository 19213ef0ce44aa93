//! Error handling primitives shared across the core.
//!
//! Client-caused failures (`Validation`, `Decode`) are kept apart from
//! server-side ones so the HTTP layer can map them without string matching.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Stable error codes surfaced in every error payload.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub enum ErrorCode {
    /// Success code used as a sentinel.
    Ok = 0,
    /// Upload failed precondition checks.
    InvalidInput = 1,
    /// Upload bytes could not be decoded into a table.
    DecodeFailed = 2,
    /// Trained artefacts missing or incompatible.
    ModelMissing = 3,
    /// Configuration could not be loaded or is inconsistent.
    Config = 4,
    /// Catch-all for bugs and infrastructure failures.
    Internal = 5,
}

/// One failed precondition, located as precisely as the check allows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// 1-based data row, `None` for column-level problems.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    pub column: String,
    pub reason: String,
}

impl ValidationIssue {
    pub fn column(column: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            row: None,
            column: column.into(),
            reason: reason.into(),
        }
    }

    pub fn cell(row: usize, column: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            row: Some(row),
            column: column.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.row {
            Some(row) => write!(f, "row {row}, column '{}': {}", self.column, self.reason),
            None => write!(f, "column '{}': {}", self.column, self.reason),
        }
    }
}

/// Every issue found while checking one upload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationReport {
    issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    /// Merge another report, skipping issues already recorded for the same cell.
    pub fn extend(&mut self, other: ValidationReport) {
        for issue in other.issues {
            let seen = self
                .issues
                .iter()
                .any(|known| known.row == issue.row && known.column == issue.column);
            if !seen {
                self.issues.push(issue);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    /// `Ok(())` when nothing was recorded, otherwise the whole report as an error.
    pub fn into_result(self) -> PloidyResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(PloidyError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} issue(s)", self.issues.len())?;
        for issue in &self.issues {
            write!(f, "; {issue}")?;
        }
        Ok(())
    }
}

/// Canonical error type for the core.
#[derive(Debug, Error)]
pub enum PloidyError {
    #[error("validation failed: {0}")]
    Validation(ValidationReport),

    #[error("could not decode upload: {0}")]
    Decode(String),

    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result alias used throughout the crate.
pub type PloidyResult<T> = Result<T, PloidyError>;

impl PloidyError {
    /// Single-issue validation helper.
    pub fn invalid(issue: ValidationIssue) -> Self {
        let mut report = ValidationReport::new();
        report.push(issue);
        Self::Validation(report)
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn model_missing(msg: impl Into<String>) -> Self {
        Self::ModelUnavailable(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Machine parsable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            PloidyError::Validation(_) => ErrorCode::InvalidInput,
            PloidyError::Decode(_) => ErrorCode::DecodeFailed,
            PloidyError::ModelUnavailable(_) => ErrorCode::ModelMissing,
            PloidyError::Config(_) => ErrorCode::Config,
            PloidyError::Internal(_) => ErrorCode::Internal,
        }
    }

    /// True when the caller, not the server, caused the failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self, PloidyError::Validation(_) | PloidyError::Decode(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ErrorCode::Ok as u32, 0);
        assert_eq!(ErrorCode::InvalidInput as u32, 1);
        assert_eq!(ErrorCode::DecodeFailed as u32, 2);
        assert_eq!(ErrorCode::ModelMissing as u32, 3);
        assert_eq!(ErrorCode::Config as u32, 4);
        assert_eq!(ErrorCode::Internal as u32, 5);
    }

    #[test]
    fn empty_report_is_ok() {
        assert!(ValidationReport::new().into_result().is_ok());
    }

    #[test]
    fn report_lists_every_issue() {
        let mut report = ValidationReport::new();
        report.push(ValidationIssue::column("Morfo", "required column is missing"));
        report.push(ValidationIssue::cell(3, "Estágio", "value '?' is not a stage"));

        let err = report.into_result().unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidInput);
        assert!(err.is_client_error());

        let text = err.to_string();
        assert!(text.contains("2 issue(s)"));
        assert!(text.contains("column 'Morfo'"));
        assert!(text.contains("row 3, column 'Estágio'"));
    }

    #[test]
    fn extend_keeps_one_issue_per_cell() {
        let mut report = ValidationReport::new();
        report.push(ValidationIssue::cell(1, "Estágio", "value 'x' is not a stage"));

        let mut later = ValidationReport::new();
        later.push(ValidationIssue::cell(1, "Estágio", "cell is blank"));
        later.push(ValidationIssue::cell(2, "Estágio", "cell is blank"));
        later.push(ValidationIssue::column("t2", "required column is missing"));
        report.extend(later);

        assert_eq!(report.len(), 3);
        assert_eq!(report.issues()[0].reason, "value 'x' is not a stage");
        assert_eq!(report.issues()[1].row, Some(2));
        assert_eq!(report.issues()[2].row, None);
    }

    #[test]
    fn server_errors_are_not_client_errors() {
        assert!(!PloidyError::model_missing("scaler").is_client_error());
        assert_eq!(
            PloidyError::model_missing("scaler").code(),
            ErrorCode::ModelMissing
        );
    }
}
