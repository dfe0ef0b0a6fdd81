//! Example Kubernetes controllers and a pod-mutating admission webhook
//!
//! Reconcilers and admission handlers are plain business logic. The
//! [`manager::Manager`] registers them with `kube::runtime`, which owns the
//! watches, cache and work queue.

pub mod client;
pub mod config;
pub mod controllers;
pub mod error;
pub mod http;
pub mod manager;
pub mod metrics;
pub mod reconcilers;
pub mod telemetry;
pub mod webhook;

pub use error::{AdmissionError, Error, Result};
