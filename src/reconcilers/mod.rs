//! Reconciliation logic invoked once per dequeued request

pub mod event;
pub mod replicaset;

use std::fmt;
use std::fmt::Debug;
use std::future::Future;

use kube::runtime::controller::Action;
use kube::{Resource, ResourceExt};
use serde::de::DeserializeOwned;

use crate::Result;

pub use event::EventReconciler;
pub use replicaset::ReplicaSetReconciler;

/// Identifies the object a reconcile invocation targets
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReconcileRequest {
    pub namespace: String,
    pub name: String,
}

impl ReconcileRequest {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Request for the object the runtime dequeued
    pub fn from_object<K: Resource>(obj: &K) -> Self {
        Self::new(obj.namespace().unwrap_or_default(), obj.name_any())
    }
}

impl fmt::Display for ReconcileRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Business logic for one resource kind
pub trait Reconciler: Send + Sync + 'static {
    /// Resource kind the runtime watches for this reconciler
    type Kind: Resource<DynamicType = ()>
        + Clone
        + DeserializeOwned
        + Debug
        + Send
        + Sync
        + 'static;

    /// Kind label used in logs and metrics
    const KIND: &'static str;

    fn reconcile(&self, request: &ReconcileRequest) -> impl Future<Output = Result<Action>> + Send;
}
