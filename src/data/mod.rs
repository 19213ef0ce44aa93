//! Data domain: upload decoding, schema normalization and feature encoding.

pub mod decode;
pub mod domain;
pub mod encode;
pub mod normalize;
pub mod service;

pub use domain::{Cell, Column, EmbryoId, NumericFrame, Table};
pub use encode::{classify_morphology, MorphologyGrade, Precursors};
pub use normalize::ColumnVocabulary;
pub use service::{prepare, GroundTruth, PreparedBatch};
