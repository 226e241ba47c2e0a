//! Implementations of the boundary traits in [`crate::services`].

pub mod open_meteo;
pub mod sink;
