//! Object access used by the reconcilers
//!
//! Reconcilers never talk to `kube::Api` directly. They depend on
//! [`ObjectClient`], which `KubeClient` implements against the API server and
//! tests implement in memory.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;

use k8s_openapi::NamespaceResourceScope;
use kube::api::{ListParams, PostParams};
use kube::{Api, Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::Result;

/// Get, list and update for one namespaced resource kind
pub trait ObjectClient<K>: Send + Sync {
    /// Fetch `namespace/name`
    fn get(&self, namespace: &str, name: &str) -> impl Future<Output = Result<K>> + Send;

    /// List objects in `namespace` matching every `key=value` in `selector`
    fn list(
        &self,
        namespace: &str,
        selector: &BTreeMap<String, String>,
    ) -> impl Future<Output = Result<Vec<K>>> + Send;

    /// Replace the stored object with `obj`
    fn update(&self, obj: &K) -> impl Future<Output = Result<K>> + Send;
}

impl<K, C> ObjectClient<K> for Arc<C>
where
    C: ObjectClient<K>,
{
    fn get(&self, namespace: &str, name: &str) -> impl Future<Output = Result<K>> + Send {
        ObjectClient::<K>::get(&**self, namespace, name)
    }

    fn list(
        &self,
        namespace: &str,
        selector: &BTreeMap<String, String>,
    ) -> impl Future<Output = Result<Vec<K>>> + Send {
        ObjectClient::<K>::list(&**self, namespace, selector)
    }

    fn update(&self, obj: &K) -> impl Future<Output = Result<K>> + Send {
        ObjectClient::<K>::update(&**self, obj)
    }
}

/// Render a label map as an equality-based selector (`a=b,c=d`)
pub fn selector_string(selector: &BTreeMap<String, String>) -> String {
    selector
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}

/// [`ObjectClient`] backed by a live `kube::Client`
#[derive(Clone)]
pub struct KubeClient {
    client: Client,
}

impl KubeClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>,
    {
        Api::namespaced(self.client.clone(), namespace)
    }
}

impl<K> ObjectClient<K> for KubeClient
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + DeserializeOwned
        + Serialize
        + Debug
        + Send
        + Sync
        + 'static,
{
    async fn get(&self, namespace: &str, name: &str) -> Result<K> {
        Ok(self.api::<K>(namespace).get(name).await?)
    }

    async fn list(&self, namespace: &str, selector: &BTreeMap<String, String>) -> Result<Vec<K>> {
        let mut params = ListParams::default();
        if !selector.is_empty() {
            params = params.labels(&selector_string(selector));
        }
        let list = self.api::<K>(namespace).list(&params).await?;
        Ok(list.items)
    }

    async fn update(&self, obj: &K) -> Result<K> {
        let namespace = obj.namespace().unwrap_or_default();
        let name = obj.name_any();
        Ok(self
            .api::<K>(&namespace)
            .replace(&name, &PostParams::default(), obj)
            .await?)
    }
}
