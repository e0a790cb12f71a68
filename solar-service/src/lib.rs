pub mod aggregate;
pub mod api;
pub mod backend;
pub mod config;
pub mod dataset;
pub mod metrics_server;
pub mod observability;
pub mod pipeline;
pub mod query;
pub mod shape;
pub mod sinks;
pub mod sources;
pub mod transform;

pub use pipeline::{Envelope, Pipeline};

#[cfg(test)]
pub(crate) mod test_support;
