//! Executor configuration.
//!
//! `ExecutorConfig` is the serializable form of an executor setup, loadable
//! from YAML. Unknown fields are ignored and every field has a default, so an
//! empty document is a valid configuration.

mod model;
mod operations;

#[cfg(test)]
mod tests;

pub use model::ExecutorConfig;
