//! In-memory object client shared by the integration tests

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use builder_examples::client::ObjectClient;
use builder_examples::{Error, Result};
use k8s_openapi::api::apps::v1::{ReplicaSet, ReplicaSetSpec};
use k8s_openapi::api::core::v1::{Event, ObjectReference, Pod, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::core::ErrorResponse;
use kube::{Resource, ResourceExt};

/// API error with the given HTTP code
pub fn api_error(code: u16, reason: &str) -> Error {
    Error::Kube(kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: format!("simulated {}", reason),
        reason: reason.to_string(),
        code,
    }))
}

pub fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn meta(namespace: &str, name: &str, pairs: &[(&str, &str)]) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        labels: if pairs.is_empty() { None } else { Some(labels(pairs)) },
        ..Default::default()
    }
}

pub fn replicaset(namespace: &str, name: &str, template: &[(&str, &str)]) -> ReplicaSet {
    ReplicaSet {
        metadata: meta(namespace, name, &[]),
        spec: Some(ReplicaSetSpec {
            selector: LabelSelector {
                match_labels: Some(labels(template)),
                ..Default::default()
            },
            template: Some(PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels(template)),
                    ..Default::default()
                }),
                spec: None,
            }),
            ..Default::default()
        }),
        status: None,
    }
}

pub fn pod(namespace: &str, name: &str, pairs: &[(&str, &str)]) -> Pod {
    Pod {
        metadata: meta(namespace, name, pairs),
        ..Default::default()
    }
}

pub fn event(namespace: &str, name: &str) -> Event {
    Event {
        metadata: meta(namespace, name, &[]),
        involved_object: ObjectReference {
            kind: Some("Pod".to_string()),
            name: Some("web-0".to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        reason: Some("Scheduled".to_string()),
        ..Default::default()
    }
}

/// Objects of one kind keyed by namespace and name
pub struct FakeStore<K> {
    objects: Mutex<BTreeMap<(String, String), K>>,
    get_error: Mutex<Option<u16>>,
    update_error: Mutex<Option<u16>>,
    updates: AtomicUsize,
}

impl<K> Default for FakeStore<K> {
    fn default() -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            get_error: Mutex::new(None),
            update_error: Mutex::new(None),
            updates: AtomicUsize::new(0),
        }
    }
}

impl<K: Resource + Clone> FakeStore<K> {
    pub fn insert(&self, obj: K) {
        let key = (obj.namespace().unwrap_or_default(), obj.name_any());
        self.objects.lock().unwrap().insert(key, obj);
    }

    pub fn remove(&self, namespace: &str, name: &str) {
        self.objects
            .lock()
            .unwrap()
            .remove(&(namespace.to_string(), name.to_string()));
    }

    pub fn stored(&self, namespace: &str, name: &str) -> Option<K> {
        self.objects
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn fail_gets_with(&self, code: u16) {
        *self.get_error.lock().unwrap() = Some(code);
    }

    pub fn fail_updates_with(&self, code: u16) {
        *self.update_error.lock().unwrap() = Some(code);
    }

    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    fn get(&self, namespace: &str, name: &str) -> Result<K> {
        if let Some(code) = *self.get_error.lock().unwrap() {
            return Err(api_error(code, "InternalError"));
        }
        self.stored(namespace, name)
            .ok_or_else(|| api_error(404, "NotFound"))
    }

    fn list(&self, namespace: &str, selector: &BTreeMap<String, String>) -> Vec<K> {
        self.objects
            .lock()
            .unwrap()
            .iter()
            .filter(|((ns, _), _)| ns == namespace)
            .filter(|(_, obj)| {
                selector
                    .iter()
                    .all(|(k, v)| obj.labels().get(k) == Some(v))
            })
            .map(|(_, obj)| obj.clone())
            .collect()
    }

    fn update(&self, obj: &K) -> Result<K> {
        if let Some(code) = *self.update_error.lock().unwrap() {
            return Err(api_error(code, "Conflict"));
        }
        let namespace = obj.namespace().unwrap_or_default();
        let name = obj.name_any();
        if self.stored(&namespace, &name).is_none() {
            return Err(api_error(404, "NotFound"));
        }
        self.insert(obj.clone());
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(obj.clone())
    }
}

/// Fake API server holding ReplicaSets, Pods and Events
#[derive(Default)]
pub struct FakeClient {
    pub replicasets: FakeStore<ReplicaSet>,
    pub pods: FakeStore<Pod>,
    pub events: FakeStore<Event>,
}

impl FakeClient {
    pub fn new() -> Self {
        Self::default()
    }
}

pub trait StoreFor<K> {
    fn store(&self) -> &FakeStore<K>;
}

impl StoreFor<ReplicaSet> for FakeClient {
    fn store(&self) -> &FakeStore<ReplicaSet> {
        &self.replicasets
    }
}

impl StoreFor<Pod> for FakeClient {
    fn store(&self) -> &FakeStore<Pod> {
        &self.pods
    }
}

impl StoreFor<Event> for FakeClient {
    fn store(&self) -> &FakeStore<Event> {
        &self.events
    }
}

impl<K> ObjectClient<K> for FakeClient
where
    FakeClient: StoreFor<K>,
    K: Resource + Clone + Send + Sync,
{
    async fn get(&self, namespace: &str, name: &str) -> Result<K> {
        StoreFor::<K>::store(self).get(namespace, name)
    }

    async fn list(&self, namespace: &str, selector: &BTreeMap<String, String>) -> Result<Vec<K>> {
        Ok(StoreFor::<K>::store(self).list(namespace, selector))
    }

    async fn update(&self, obj: &K) -> Result<K> {
        StoreFor::<K>::store(self).update(obj)
    }
}
