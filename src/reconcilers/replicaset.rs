//! ReplicaSet pod counter
//!
//! Labels every ReplicaSet with the number of pods whose labels equal its
//! pod-template labels.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::ReplicaSet;
use k8s_openapi::api::core::v1::Pod;
use kube::runtime::controller::Action;
use kube::ResourceExt;
use tracing::{info, instrument};

use crate::client::ObjectClient;
use crate::metrics::prometheus::POD_COUNT;
use crate::reconcilers::{ReconcileRequest, Reconciler};
use crate::Result;

/// Label written onto each ReplicaSet
pub const POD_COUNT_LABEL: &str = "pod-count";

/// Labels from `spec.template.metadata.labels`, empty when unset
pub fn template_labels(rs: &ReplicaSet) -> BTreeMap<String, String> {
    rs.spec
        .as_ref()
        .and_then(|spec| spec.template.as_ref())
        .and_then(|template| template.metadata.as_ref())
        .and_then(|meta| meta.labels.clone())
        .unwrap_or_default()
}

/// Count pods whose label set is exactly `labels`
pub fn count_matching_pods(pods: &[Pod], labels: &BTreeMap<String, String>) -> usize {
    pods.iter().filter(|pod| pod.labels() == labels).count()
}

/// Write the pod count label, leaving every other label untouched
pub fn set_pod_count(rs: &mut ReplicaSet, count: usize) {
    rs.labels_mut()
        .insert(POD_COUNT_LABEL.to_string(), count.to_string());
}

/// Reconciler that keeps the `pod-count` label current
pub struct ReplicaSetReconciler<C> {
    client: C,
}

impl<C> ReplicaSetReconciler<C>
where
    C: ObjectClient<ReplicaSet> + ObjectClient<Pod>,
{
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

impl<C> Reconciler for ReplicaSetReconciler<C>
where
    C: ObjectClient<ReplicaSet> + ObjectClient<Pod> + 'static,
{
    type Kind = ReplicaSet;

    const KIND: &'static str = "ReplicaSet";

    #[instrument(skip_all, fields(request = %request))]
    async fn reconcile(&self, request: &ReconcileRequest) -> Result<Action> {
        let mut rs: ReplicaSet =
            ObjectClient::<ReplicaSet>::get(&self.client, &request.namespace, &request.name)
                .await?;

        let labels = template_labels(&rs);
        let pods: Vec<Pod> =
            ObjectClient::<Pod>::list(&self.client, &request.namespace, &labels).await?;
        let count = count_matching_pods(&pods, &labels);

        set_pod_count(&mut rs, count);

        // Conflicts propagate; the runtime requeues and the next run reads fresh state.
        ObjectClient::<ReplicaSet>::update(&self.client, &rs).await?;

        POD_COUNT
            .with_label_values(&[request.namespace.as_str(), request.name.as_str()])
            .set(count as f64);

        info!("Set {}={} on ReplicaSet {}", POD_COUNT_LABEL, count, request);

        Ok(Action::await_change())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::apps::v1::ReplicaSetSpec;
    use k8s_openapi::api::core::v1::PodTemplateSpec;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn pod(pairs: &[(&str, &str)]) -> Pod {
        Pod {
            metadata: ObjectMeta {
                labels: if pairs.is_empty() { None } else { Some(labels(pairs)) },
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn template_labels_missing_template_is_empty() {
        assert!(template_labels(&ReplicaSet::default()).is_empty());

        let rs = ReplicaSet {
            spec: Some(ReplicaSetSpec {
                template: Some(PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(labels(&[("app", "web")])),
                        ..Default::default()
                    }),
                    spec: None,
                }),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(template_labels(&rs), labels(&[("app", "web")]));
    }

    #[test]
    fn superset_labels_are_not_counted() {
        let pods = vec![
            pod(&[("app", "web")]),
            pod(&[("app", "web"), ("canary", "true")]),
            pod(&[("app", "other")]),
            pod(&[]),
        ];
        assert_eq!(count_matching_pods(&pods, &labels(&[("app", "web")])), 1);
        assert_eq!(count_matching_pods(&pods, &BTreeMap::new()), 1);
    }

    #[test]
    fn set_pod_count_keeps_other_labels() {
        let mut rs = ReplicaSet::default();
        rs.labels_mut().insert("app".to_string(), "web".to_string());
        set_pod_count(&mut rs, 12);
        set_pod_count(&mut rs, 3);
        assert_eq!(rs.labels(), &labels(&[("app", "web"), ("pod-count", "3")]));
    }
}
