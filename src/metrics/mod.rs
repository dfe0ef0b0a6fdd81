//! Prometheus metrics for the example controllers and webhook
//!
//! This module exposes metrics for monitoring reconcile and admission traffic.

pub mod prometheus;

pub use prometheus::*;
