//! ReplicaSet pod counter
//!
//! Labels each ReplicaSet in the `default` namespace with the number of pods
//! matching its template labels. Pod changes requeue the owning ReplicaSet.

use k8s_openapi::api::core::v1::Pod;
use tracing::info;

use builder_examples::config::{ManagerConfig, DEFAULT_NAMESPACE};
use builder_examples::controllers::ControllerOptions;
use builder_examples::manager::Manager;
use builder_examples::reconcilers::ReplicaSetReconciler;
use builder_examples::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing();

    info!("Starting builder-examples ReplicaSet pod counter");

    let config = ManagerConfig::namespaced(DEFAULT_NAMESPACE).with_env_overrides()?;
    let mut manager = Manager::new(config).await?;

    let pods = manager.api::<Pod>();
    let reconciler = ReplicaSetReconciler::new(manager.client());
    manager.add_controller(reconciler, ControllerOptions::default().owns_pods(pods));

    manager.start().await?;

    info!("builder-examples ReplicaSet pod counter stopped");
    Ok(())
}
