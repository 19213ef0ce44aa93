//! Embryo ploidy inference over morphokinetic spreadsheets.
//!
//! `data` turns an upload into canonical numeric columns, `model` holds the
//! trained artefacts, `inference` runs the batch, `explain` and `evaluation`
//! add per-row explanations and labelled-upload metrics, and `api` serves it
//! all over HTTP.

pub mod api;
pub mod common;
pub mod data;
pub mod evaluation;
pub mod explain;
pub mod inference;
pub mod model;

pub use common::error::{PloidyError, PloidyResult};
pub use inference::{BatchOutcome, Pipeline, PredictionRecord};
