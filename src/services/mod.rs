//! Traits at the pipeline's external boundaries.

pub mod measurement_source;
pub mod mirror_sink;
