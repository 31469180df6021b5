//! Metrics collection and export for courier.
//!
//! This crate provides the metric names used by the dispatch pipeline on top
//! of the `metrics` crate facade. When the `prometheus` feature is enabled,
//! metrics are exported in Prometheus text format.
//!
//! # Usage
//!
//! ```rust,ignore
//! use courier_metrics::{counter, dispatch, labels};
//!
//! counter!(dispatch::DISPATCHES_TOTAL, labels::MODE => "edit").increment(1);
//! ```

mod definitions;
mod recorder;

pub use {
    definitions::*,
    recorder::{MetricsHandle, MetricsRecorderConfig, init_metrics},
};

// Re-export metrics macros for convenience
pub use metrics::{counter, gauge, histogram};
