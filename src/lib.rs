pub mod analyzers;
pub mod audit;
pub mod classify;
pub mod collector;
pub mod config;
pub mod fetch;
pub mod infra;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod samples;
pub mod services;
pub mod store;
