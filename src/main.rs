//! Event watcher with a pod-mutating admission webhook
//!
//! Watches Events in the `default` namespace, forwarding deletes only when the
//! deleted object carries a deletion timestamp, and serves the pod annotator
//! at `/mutate-v1-pod`.

use k8s_openapi::api::core::v1::Event;
use tracing::info;

use builder_examples::config::{ManagerConfig, DEFAULT_NAMESPACE};
use builder_examples::controllers::{ControllerOptions, EventFilter};
use builder_examples::manager::Manager;
use builder_examples::reconcilers::EventReconciler;
use builder_examples::telemetry;
use builder_examples::webhook::{PodAnnotator, MUTATE_POD_PATH};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing();

    info!("Starting builder-examples event watcher");

    let config = ManagerConfig::namespaced(DEFAULT_NAMESPACE).with_env_overrides()?;
    let mut manager = Manager::new(config).await?;

    let reconciler = EventReconciler::new(manager.client());
    manager.add_controller(
        reconciler,
        ControllerOptions::default().filter(EventFilter::<Event>::deletions_with_timestamp()),
    );

    info!("Setting up webhook server");
    manager.register_webhook(MUTATE_POD_PATH, PodAnnotator);

    manager.start().await?;

    info!("builder-examples event watcher stopped");
    Ok(())
}
