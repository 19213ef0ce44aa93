//! Inference domain: alignment, batch scoring and result assembly.

pub mod align;
pub mod domain;
pub mod service;
pub mod workers;

pub use align::align;
pub use domain::{BatchOutcome, PloidyStatus, PredictionRecord};
pub use service::Pipeline;
pub use workers::Pool;
