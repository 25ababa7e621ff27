//! Collaborator interfaces used by step bodies.
//!
//! The engine never calls these itself. They give step bodies a common
//! shape for pulling data in and pushing results out, so a pipeline can
//! swap a live fetcher for a canned one in tests.

pub mod json_sink;

use crate::context::ExecutionContext;

pub use json_sink::JsonFileSink;

/// Retrieves remote data for a step.
///
/// Retry and backoff, if any, belong to the implementation.
pub trait Fetcher<D> {
    type Request;
    type Response;

    fn fetch(
        &self,
        request: &Self::Request,
        context: &ExecutionContext<D>,
    ) -> anyhow::Result<Self::Response>;
}

/// Destination for step output.
pub trait Sink<D> {
    type Item;

    /// Accept one item. Implementations may buffer.
    fn write(&mut self, item: Self::Item, context: &ExecutionContext<D>) -> anyhow::Result<()>;

    /// Persist anything buffered.
    fn flush(&mut self, context: &ExecutionContext<D>) -> anyhow::Result<()>;
}
